use absence_store::{Group, Role, User};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::AdminUser;
use super::AppState;
use crate::error::{ApiError, ApiJson, ApiPath};

const MAX_GROUP_NAME_LEN: usize = 50;

#[derive(Debug, Deserialize)]
pub struct GroupCreate {
    pub name: String,
}

pub async fn list(_: AdminUser, State(state): State<AppState>) -> Result<Json<Vec<Group>>, ApiError> {
    Ok(Json(state.store.list_groups().await?))
}

pub async fn create(
    _: AdminUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<GroupCreate>,
) -> Result<Json<Group>, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::Unprocessable("name must not be empty".into()));
    }
    if name.chars().count() > MAX_GROUP_NAME_LEN {
        return Err(ApiError::Unprocessable(format!(
            "name is longer than {MAX_GROUP_NAME_LEN} characters"
        )));
    }
    Ok(Json(state.store.create_group(name).await?))
}

async fn existing_group(state: &AppState, id: i64) -> Result<Group, ApiError> {
    state
        .store
        .get_group(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found"))
}

pub async fn students(
    _: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<User>>, ApiError> {
    existing_group(&state, id).await?;
    Ok(Json(state.store.group_students(id).await?))
}

pub async fn add_student(
    _: AdminUser,
    State(state): State<AppState>,
    ApiPath((id, student_id)): ApiPath<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    existing_group(&state, id).await?;
    state
        .store
        .get_user_with_role(student_id, Role::Student)
        .await?
        .ok_or_else(|| ApiError::not_found("Student not found"))?;

    let message = if state.store.add_student(id, student_id).await? {
        "Student added"
    } else {
        "Already in group"
    };
    Ok(Json(json!({ "message": message })))
}

pub async fn remove_student(
    _: AdminUser,
    State(state): State<AppState>,
    ApiPath((id, student_id)): ApiPath<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    existing_group(&state, id).await?;
    if !state.store.remove_student(id, student_id).await? {
        return Err(ApiError::not_found("Student is not in this group"));
    }
    Ok(Json(json!({ "message": "Student removed" })))
}

pub async fn remove(
    _: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_group(id).await? {
        return Err(ApiError::not_found("Group not found"));
    }
    Ok(Json(json!({ "message": "Group deleted" })))
}
