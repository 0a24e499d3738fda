//! Face enrollment and photo attendance.

use std::collections::BTreeMap;

use absence_core::{CosineMatcher, Embedding, Enrollment, Matcher};
use absence_store::{AttendanceSource, Role};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use super::auth::{AdminUser, StaffUser};
use super::AppState;
use crate::engine::{DetectedFace, EngineHandle};
use crate::error::{ApiError, ApiPath};

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub path: String,
    pub present: bool,
}

#[derive(Debug, Serialize)]
pub struct FaceStatus {
    pub backend: &'static str,
    pub engine_loaded: bool,
    pub detector: ModelStatus,
    pub recognizer: ModelStatus,
    /// Students with a stored face encoding.
    pub registered_faces: usize,
    pub similarity_threshold: f32,
    pub detection_threshold: f32,
    pub max_image_side: u32,
}

pub async fn status(State(state): State<AppState>) -> Result<Json<FaceStatus>, ApiError> {
    let model = |path: &std::path::Path| ModelStatus {
        path: path.display().to_string(),
        present: path.is_file(),
    };
    let registered_faces = state.store.enrolled_user_ids().await?.len();
    let face = &state.face;
    Ok(Json(FaceStatus {
        backend: "scrfd+arcface (onnxruntime)",
        engine_loaded: state.engine.is_some(),
        detector: model(&face.detector_model),
        recognizer: model(&face.recognizer_model),
        registered_faces,
        similarity_threshold: face.similarity_threshold,
        detection_threshold: face.detection_threshold,
        max_image_side: face.max_image_side,
    }))
}

fn engine(state: &AppState) -> Result<&EngineHandle, ApiError> {
    state
        .engine
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Face recognition models are not loaded".into()))
}

/// Pull the bytes of the `file` field out of a multipart upload.
async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<Vec<u8>, ApiError> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            return Ok(field.bytes().await?.to_vec());
        }
    }
    Err(ApiError::Unprocessable(format!("missing multipart field '{UPLOAD_FIELD}'")))
}

pub async fn register(
    _: AdminUser,
    State(state): State<AppState>,
    ApiPath(student_id): ApiPath<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .get_user_with_role(student_id, Role::Student)
        .await?
        .ok_or_else(|| ApiError::not_found("Student not found"))?;

    let image = read_upload(multipart).await?;
    if image.is_empty() {
        return Err(ApiError::bad_request("Empty file"));
    }
    let mut detections = engine(&state)?.analyze(image).await?;

    let detected = match detections.len() {
        0 => return Err(ApiError::bad_request("No face detected")),
        1 => detections.remove(0),
        n => {
            return Err(ApiError::bad_request(format!(
                "{n} faces detected; upload a photo with exactly one face"
            )))
        }
    };

    let encoding = detected
        .embedding
        .to_json()
        .map_err(|e| ApiError::Internal(format!("encoding serialization: {e}")))?;
    state.store.upsert_face(student_id, encoding).await?;
    tracing::info!(student_id, confidence = detected.face.confidence, "face registered");

    Ok(Json(json!({
        "message": "Face registered",
        "user_id": student_id,
        "confidence": detected.face.confidence,
    })))
}

pub async fn unregister(
    _: AdminUser,
    State(state): State<AppState>,
    ApiPath(student_id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_face(student_id).await? {
        return Err(ApiError::not_found("No registered face for this student"));
    }
    Ok(Json(json!({ "message": "Face removed" })))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recognized {
    pub user_id: i64,
    pub similarity: f32,
    pub already_marked: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkAttendanceResponse {
    pub session_id: i64,
    pub faces_in_image: usize,
    pub recognized: Vec<Recognized>,
}

/// Match every detected face; keep the best similarity per student.
fn best_matches(detections: &[DetectedFace], gallery: &[Enrollment], threshold: f32) -> BTreeMap<i64, f32> {
    let matcher = CosineMatcher;
    let mut best: BTreeMap<i64, f32> = BTreeMap::new();
    for detected in detections {
        let result = matcher.compare(&detected.embedding, gallery, threshold);
        let Some(user_id) = result.user_id.filter(|_| result.matched) else {
            continue;
        };
        best.entry(user_id)
            .and_modify(|s| *s = s.max(result.similarity))
            .or_insert(result.similarity);
    }
    best
}

pub async fn mark_attendance(
    _: StaffUser,
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MarkAttendanceResponse>, ApiError> {
    let session = state
        .store
        .get_session(session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    if state.store.group_students(session.group_id).await?.is_empty() {
        return Err(ApiError::bad_request("No students in this group"));
    }

    let stored = state.store.group_faces(session.group_id).await?;
    if stored.is_empty() {
        return Err(ApiError::bad_request("No registered faces for this group"));
    }
    let gallery: Vec<Enrollment> = stored
        .into_iter()
        .filter_map(|face| match Embedding::from_json(&face.encoding) {
            Ok(embedding) if embedding.dim() > 0 => Some(Enrollment {
                user_id: face.user_id,
                embedding,
            }),
            Ok(_) => {
                tracing::warn!(user_id = face.user_id, "skipping empty stored encoding");
                None
            }
            Err(e) => {
                tracing::warn!(user_id = face.user_id, error = %e, "skipping unreadable stored encoding");
                None
            }
        })
        .collect();
    if gallery.is_empty() {
        return Err(ApiError::bad_request("Invalid stored encodings; re-register faces"));
    }

    let engine = engine(&state)?;
    let image = read_upload(multipart).await?;
    if image.is_empty() {
        return Err(ApiError::bad_request("Empty file"));
    }
    let detections = engine.analyze(image).await?;
    if detections.is_empty() {
        return Err(ApiError::bad_request("No face detected"));
    }

    let matches = best_matches(&detections, &gallery, state.face.similarity_threshold);
    if matches.is_empty() {
        tracing::info!(session_id, faces = detections.len(), "no student recognized");
        return Err(ApiError::not_found("No student recognized"));
    }

    let now = Utc::now().naive_utc();
    let mut recognized = Vec::with_capacity(matches.len());
    for (user_id, similarity) in matches {
        let (_, inserted) = state
            .store
            .mark_present(session_id, user_id, AttendanceSource::Face, now)
            .await?;
        recognized.push(Recognized {
            user_id,
            similarity,
            already_marked: !inserted,
        });
    }

    tracing::info!(
        session_id,
        faces = detections.len(),
        recognized = recognized.len(),
        "photo attendance processed"
    );
    Ok(Json(MarkAttendanceResponse {
        session_id,
        faces_in_image: detections.len(),
        recognized,
    }))
}
