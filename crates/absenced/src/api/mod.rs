//! HTTP API, mounted under `/api/v1`.

mod attendance;
pub mod auth;
mod face;
mod groups;
mod sessions;
mod users;

use std::path::PathBuf;
use std::sync::Arc;

use absence_store::Store;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::Layer;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::engine::EngineHandle;
use crate::error::ApiError;

/// Settings the face endpoints report and apply.
#[derive(Debug, Clone)]
pub struct FaceSettings {
    pub similarity_threshold: f32,
    pub detection_threshold: f32,
    pub max_image_side: u32,
    pub detector_model: PathBuf,
    pub recognizer_model: PathBuf,
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: TokenKeys,
    /// `None` when the face models could not be loaded.
    pub engine: Option<EngineHandle>,
    pub face: Arc<FaceSettings>,
}

impl AppState {
    pub fn new(config: &Config, store: Store, engine: Option<EngineHandle>) -> Self {
        Self {
            store,
            tokens: TokenKeys::new(&config.secret_key, config.token_expire_minutes),
            engine,
            face: Arc::new(FaceSettings {
                similarity_threshold: config.similarity_threshold,
                detection_threshold: config.detection_threshold,
                max_image_side: config.max_image_side,
                detector_model: config.detector_model_path(),
                recognizer_model: config.recognizer_model_path(),
            }),
        }
    }
}

/// The served application: the API routes with trailing slashes trimmed before
/// routing, so `/api/v1/users/` reaches the same handler as `/api/v1/users`.
pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    let routes = router(state, max_upload_bytes);
    Router::new().fallback_service(NormalizePathLayer::trim_trailing_slash().layer(routes))
}

/// Routes, layers and state, without path normalization.
fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/{id}",
            get(users::get_one).patch(users::update).delete(users::remove),
        )
        .route("/groups", get(groups::list).post(groups::create))
        .route("/groups/{id}", delete(groups::remove))
        .route("/groups/{id}/students", get(groups::students))
        .route("/groups/{id}/add-student/{student_id}", post(groups::add_student))
        .route("/groups/{id}/students/{student_id}", delete(groups::remove_student))
        .route("/sessions", get(sessions::list).post(sessions::create))
        .route("/sessions/{id}", get(sessions::get_one).delete(sessions::remove))
        .route("/face/status", get(face::status))
        .route(
            "/face/register/{student_id}",
            post(face::register).delete(face::unregister),
        )
        .route("/face/mark-attendance/{session_id}", post(face::mark_attendance))
        .route("/attendance/export", get(attendance::export))
        .route("/attendance/session/{id}", get(attendance::roster))
        .route(
            "/attendance/session/{id}/students/{student_id}",
            post(attendance::mark).delete(attendance::unmark),
        );

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", api)
        .fallback(unknown_route)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Auto-Absence API is running" }))
}

async fn unknown_route() -> ApiError {
    ApiError::not_found("Not Found")
}
