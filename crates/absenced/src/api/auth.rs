//! Login, the current-user endpoint and the role extractors.

use absence_store::password::verify_password;
use absence_store::{Role, User};
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::{ApiError, ApiForm};

/// OAuth2 password-grant form. Other grant fields are accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

pub async fn login(
    State(state): State<AppState>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    const REJECTED: ApiError = ApiError::Unauthorized("Bad credentials");

    let user = state
        .store
        .find_user_by_email(&form.username)
        .await?
        .ok_or(REJECTED)?;
    let Some(hash) = user.hashed_password.clone() else {
        return Err(REJECTED);
    };

    let password = form.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password check panicked: {e}")))?;
    if !valid {
        tracing::info!(user_id = user.id, "login rejected");
        return Err(REJECTED);
    }
    if !user.is_active {
        return Err(ApiError::Unauthorized("Inactive user"));
    }

    let access_token = state
        .tokens
        .issue(&user.email)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    tracing::info!(user_id = user.id, role = %user.role, "login");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim()).filter(|t| !t.is_empty())
}

/// Any authenticated, active user.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized("Invalid token"))?;
        let claims = state.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            ApiError::Unauthorized("Invalid token")
        })?;

        let user = state
            .store
            .find_user_by_email(&claims.sub)
            .await?
            .ok_or(ApiError::Unauthorized("Inactive user"))?;
        if !user.is_active {
            return Err(ApiError::Unauthorized("Inactive user"));
        }
        Ok(CurrentUser(user))
    }
}

/// An authenticated administrator.
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(ApiError::Forbidden("Admin only"));
        }
        Ok(AdminUser(user))
    }
}

/// An authenticated administrator or teacher.
pub struct StaffUser(pub User);

impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !matches!(user.role, Role::Admin | Role::Teacher) {
            return Err(ApiError::Forbidden("Teacher/Admin only"));
        }
        Ok(StaffUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
