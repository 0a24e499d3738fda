use absence_store::{ClassSession, NewSession, Role};
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::auth::{AdminUser, StaffUser};
use super::AppState;
use crate::error::{ApiError, ApiJson, ApiPath};

pub async fn list(_: AdminUser, State(state): State<AppState>) -> Result<Json<Vec<ClassSession>>, ApiError> {
    Ok(Json(state.store.list_sessions().await?))
}

pub async fn create(
    _: AdminUser,
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewSession>,
) -> Result<Json<ClassSession>, ApiError> {
    if state.store.get_group(new.group_id).await?.is_none() {
        return Err(ApiError::not_found("Group not found"));
    }
    if let Some(teacher_id) = new.teacher_id {
        if state.store.get_user_with_role(teacher_id, Role::Teacher).await?.is_none() {
            return Err(ApiError::not_found("Teacher not found"));
        }
    }
    if new.end_time <= new.start_time {
        return Err(ApiError::Unprocessable("end_time must be after start_time".into()));
    }
    Ok(Json(state.store.create_session(new).await?))
}

pub async fn get_one(
    _: StaffUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ClassSession>, ApiError> {
    let session = state
        .store
        .get_session(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;
    Ok(Json(session))
}

pub async fn remove(
    _: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_session(id).await? {
        return Err(ApiError::not_found("Session not found"));
    }
    Ok(Json(json!({ "message": "Session deleted" })))
}
