use absence_store::password::hash_password;
use absence_store::{NewUser, User};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::AdminUser;
use super::AppState;
use crate::error::{ApiError, ApiJson, ApiPath};

pub async fn list(_: AdminUser, State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

pub async fn create(
    _: AdminUser,
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewUser>,
) -> Result<Json<User>, ApiError> {
    let new = new.normalized().map_err(ApiError::Unprocessable)?;

    if state.store.find_user_by_email(&new.email).await?.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let hashed = match new.password.clone() {
        Some(password) => Some(
            tokio::task::spawn_blocking(move || hash_password(&password))
                .await
                .map_err(|e| ApiError::Internal(format!("password hashing panicked: {e}")))?
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        ),
        None => None,
    };

    let user = state
        .store
        .create_user(new, hashed)
        .await?
        .ok_or_else(|| ApiError::bad_request("Email already exists"))?;
    Ok(Json(user))
}

pub async fn get_one(
    _: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct UserUpdate {
    pub is_active: Option<bool>,
}

/// Activate or deactivate an account.
pub async fn update(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    if let Some(active) = update.is_active {
        if id == admin.id && !active {
            return Err(ApiError::bad_request("You cannot deactivate yourself"));
        }
        if !state.store.set_user_active(id, active).await? {
            return Err(ApiError::not_found("User not found"));
        }
        tracing::info!(user_id = id, active, by = admin.id, "user activation changed");
    }
    get_one(AdminUser(admin), State(state), ApiPath(id)).await
}

pub async fn remove(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    if id == admin.id {
        return Err(ApiError::bad_request("You cannot delete yourself"));
    }
    if !state.store.delete_user(id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(Json(json!({ "message": "User deleted" })))
}
