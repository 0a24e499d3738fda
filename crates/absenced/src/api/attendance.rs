use absence_store::{AttendanceSource, ClassSession, RosterEntry};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::auth::StaffUser;
use super::AppState;
use crate::error::{ApiError, ApiPath, ApiQuery};
use crate::export::{attendance_workbook, export_filename, XLSX_CONTENT_TYPE};

async fn existing_session(state: &AppState, id: i64) -> Result<ClassSession, ApiError> {
    state
        .store
        .get_session(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))
}

#[derive(Debug, Serialize)]
pub struct Roster {
    pub session: ClassSession,
    pub students: Vec<RosterEntry>,
}

pub async fn roster(
    _: StaffUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Roster>, ApiError> {
    let session = existing_session(&state, id).await?;
    let students = state.store.roster(&session).await?;
    Ok(Json(Roster { session, students }))
}

#[derive(Debug, Serialize)]
pub struct ManualMark {
    pub session_id: i64,
    pub user_id: i64,
    pub already_marked: bool,
}

pub async fn mark(
    StaffUser(by): StaffUser,
    State(state): State<AppState>,
    ApiPath((id, student_id)): ApiPath<(i64, i64)>,
) -> Result<Json<ManualMark>, ApiError> {
    let session = existing_session(&state, id).await?;
    if !state.store.is_member(session.group_id, student_id).await? {
        return Err(ApiError::bad_request("Student is not in this session's group"));
    }

    let now = Utc::now().naive_utc();
    let (_, inserted) = state
        .store
        .mark_present(session.id, student_id, AttendanceSource::Manual, now)
        .await?;
    tracing::debug!(session_id = id, student_id, by = by.id, inserted, "manual mark");
    Ok(Json(ManualMark {
        session_id: session.id,
        user_id: student_id,
        already_marked: !inserted,
    }))
}

pub async fn unmark(
    _: StaffUser,
    State(state): State<AppState>,
    ApiPath((id, student_id)): ApiPath<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    existing_session(&state, id).await?;
    if !state.store.unmark(id, student_id).await? {
        return Err(ApiError::not_found("Attendance not found"));
    }
    Ok(Json(json!({ "message": "Attendance removed" })))
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub session_id: Option<i64>,
    pub group_id: Option<i64>,
}

/// Download attendance as .xlsx for one session, or every session of a group.
pub async fn export(
    _: StaffUser,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ExportParams>,
) -> Result<Response, ApiError> {
    let sessions = match (params.session_id, params.group_id) {
        (Some(id), _) => state.store.get_session(id).await?.into_iter().collect(),
        (None, Some(group_id)) => state.store.group_sessions(group_id).await?,
        (None, None) => return Err(ApiError::bad_request("session_id or group_id required")),
    };
    if sessions.is_empty() {
        return Err(ApiError::not_found("No sessions found"));
    }

    let ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
    let rows = state.store.export_rows(ids).await?;
    let bytes = attendance_workbook(&rows).map_err(|e| ApiError::Internal(format!("xlsx: {e}")))?;

    let filename = export_filename(params.session_id, params.group_id);
    tracing::info!(sessions = sessions.len(), rows = rows.len(), %filename, "attendance exported");
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename={filename}")),
        ],
        bytes,
    )
        .into_response())
}
