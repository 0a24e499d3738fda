use std::io::{Cursor, Read};

use absence_core::{BoundingBox, Embedding, Photo};
use absence_store::password::hash_password;
use absence_store::{NewUser, Role, Store};
use absenced::api::{app, AppState};
use absenced::config::Config;
use absenced::engine::{spawn_engine, EngineError, FaceBackend, DetectedFace};
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};

/// Every non-black pixel of the top row is a face; its RGB value is the embedding.
struct PixelBackend;

impl FaceBackend for PixelBackend {
    fn analyze(&mut self, photo: &Photo) -> Result<Vec<DetectedFace>, EngineError> {
        Ok((0..photo.width)
            .filter(|&x| photo.pixel(x, 0) != [0, 0, 0])
            .map(|x| DetectedFace {
                face: BoundingBox {
                    x: x as f32,
                    y: 0.0,
                    width: 1.0,
                    height: 1.0,
                    confidence: 0.99,
                    landmarks: None,
                },
                embedding: Embedding::new(photo.pixel(x, 0).iter().map(|&c| c as f32).collect()),
            })
            .collect())
    }
}

const RED: [u8; 3] = [255, 0, 0];
const GREEN: [u8; 3] = [0, 255, 0];
const BLUE: [u8; 3] = [0, 0, 255];
const BLACK: [u8; 3] = [0, 0, 0];

fn png(pixels: &[[u8; 3]]) -> Vec<u8> {
    let mut img = RgbImage::new(pixels.len() as u32, 1);
    for (x, p) in pixels.iter().enumerate() {
        img.put_pixel(x as u32, 0, Rgb(*p));
    }
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn upload(bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part("file", Part::bytes(bytes).file_name("photo.png").mime_type("image/png"))
}

struct Harness {
    server: TestServer,
    store: Store,
    admin: String,
    teacher: String,
    admin_id: i64,
}

async fn add_user(store: &Store, email: &str, role: Role, password: Option<&str>) -> i64 {
    let new = NewUser {
        first_name: "First".into(),
        last_name: "Last".into(),
        email: email.into(),
        role,
        password: None,
    };
    let hashed = password.map(|p| hash_password(p).unwrap());
    store.create_user(new, hashed).await.unwrap().unwrap().id
}

async fn harness_with(engine: bool, upload_limit: Option<usize>) -> Harness {
    let config = Config::from_lookup(|key| match key {
        "ABSENCE_SECRET_KEY" => Some("test-secret".to_string()),
        "ABSENCE_MODEL_DIR" => Some("/nonexistent/models".to_string()),
        _ => None,
    });
    let store = Store::open_in_memory().await.unwrap();
    let admin_id = add_user(&store, "admin@example.com", Role::Admin, Some("admin123")).await;
    add_user(&store, "teacher@example.com", Role::Teacher, Some("teacher123")).await;

    let engine = engine.then(|| spawn_engine(PixelBackend, config.max_image_side).unwrap());
    let state = AppState::new(&config, store.clone(), engine);
    let limit = upload_limit.unwrap_or(config.max_upload_bytes);
    let server = TestServer::new(app(state, limit)).unwrap();

    let admin = login(&server, "admin@example.com", "admin123").await;
    let teacher = login(&server, "teacher@example.com", "teacher123").await;
    Harness {
        server,
        store,
        admin,
        teacher,
        admin_id,
    }
}

async fn harness() -> Harness {
    harness_with(true, None).await
}

async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let resp = server
        .post("/api/v1/auth/login")
        .form(&[("username", email), ("password", password)])
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK, "login failed for {email}");
    let body: Value = resp.json();
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

/// A group with `n` students and a session; returns (group, session, students).
async fn classroom(h: &Harness, n: usize) -> (i64, i64, Vec<i64>) {
    let group: Value = h
        .server
        .post("/api/v1/groups")
        .authorization_bearer(&h.admin)
        .json(&json!({ "name": "GI1-A" }))
        .await
        .json();
    let group_id = group["id"].as_i64().unwrap();

    let mut students = Vec::new();
    for i in 0..n {
        let user: Value = h
            .server
            .post("/api/v1/users")
            .authorization_bearer(&h.admin)
            .json(&json!({
                "first_name": format!("Student{i}"),
                "last_name": "Test",
                "email": format!("student{i}@example.com"),
                "role": "STUDENT",
            }))
            .await
            .json();
        let id = user["id"].as_i64().unwrap();
        let resp = h
            .server
            .post(&format!("/api/v1/groups/{group_id}/add-student/{id}"))
            .authorization_bearer(&h.admin)
            .await;
        assert_eq!(resp.json::<Value>()["message"], "Student added");
        students.push(id);
    }

    let session: Value = h
        .server
        .post("/api/v1/sessions")
        .authorization_bearer(&h.admin)
        .json(&json!({
            "group_id": group_id,
            "start_time": "2025-01-06T08:00",
            "end_time": "2025-01-06T10:00",
        }))
        .await
        .json();
    (group_id, session["id"].as_i64().unwrap(), students)
}

async fn register(h: &Harness, student: i64, pixels: &[[u8; 3]]) -> axum_test::TestResponse {
    h.server
        .post(&format!("/api/v1/face/register/{student}"))
        .authorization_bearer(&h.admin)
        .multipart(upload(png(pixels)))
        .await
}

async fn mark_by_photo(h: &Harness, session: i64, pixels: &[[u8; 3]]) -> axum_test::TestResponse {
    h.server
        .post(&format!("/api/v1/face/mark-attendance/{session}"))
        .authorization_bearer(&h.teacher)
        .multipart(upload(png(pixels)))
        .await
}

#[tokio::test]
async fn test_root_and_status_are_public() {
    let h = harness().await;
    let body: Value = h.server.get("/").await.json();
    assert_eq!(body["message"], "Auto-Absence API is running");

    let status: Value = h.server.get("/api/v1/face/status").await.json();
    assert_eq!(status["engine_loaded"], true);
    assert_eq!(status["detector"]["present"], false);
    assert_eq!(status["registered_faces"], 0);
    assert!(status["similarity_threshold"].as_f64().unwrap() > 0.39);
}

#[tokio::test]
async fn test_login_and_me() {
    let h = harness().await;
    let me: Value = h.server.get("/api/v1/auth/me").authorization_bearer(&h.teacher).await.json();
    assert_eq!(me["email"], "teacher@example.com");
    assert_eq!(me["role"], "TEACHER");
    assert!(me.get("hashed_password").is_none());

    let resp = h
        .server
        .post("/api/v1/auth/login")
        .form(&[("username", "admin@example.com"), ("password", "wrong")])
        .await;
    assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json::<Value>()["detail"], "Bad credentials");

    let resp = h.server.get("/api/v1/auth/me").await;
    assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
    let resp = h.server.get("/api/v1/auth/me").authorization_bearer("garbage").await;
    assert_eq!(resp.json::<Value>()["detail"], "Invalid token");
}

#[tokio::test]
async fn test_role_guards() {
    let h = harness().await;
    let resp = h.server.get("/api/v1/users").authorization_bearer(&h.teacher).await;
    assert_eq!(resp.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(resp.json::<Value>()["detail"], "Admin only");

    add_user(&h.store, "pupil@example.com", Role::Student, Some("pupil123")).await;
    let pupil = login(&h.server, "pupil@example.com", "pupil123").await;
    let resp = h.server.get("/api/v1/sessions/1").authorization_bearer(&pupil).await;
    assert_eq!(resp.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(resp.json::<Value>()["detail"], "Teacher/Admin only");
}

#[tokio::test]
async fn test_user_management() {
    let h = harness().await;
    let new_user = json!({
        "first_name": " Ana ",
        "last_name": "Silva",
        "email": "Ana@School.org",
        "role": "STUDENT",
        "password": "pw"
    });
    let created: Value = h
        .server
        .post("/api/v1/users")
        .authorization_bearer(&h.admin)
        .json(&new_user)
        .await
        .json();
    assert_eq!(created["email"], "ana@school.org");
    assert_eq!(created["first_name"], "Ana");
    let id = created["id"].as_i64().unwrap();

    let resp = h.server.post("/api/v1/users").authorization_bearer(&h.admin).json(&new_user).await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.json::<Value>()["detail"], "Email already exists");

    let resp = h
        .server
        .post("/api/v1/users")
        .authorization_bearer(&h.admin)
        .json(&json!({ "first_name": "A", "last_name": "B", "email": "nope", "role": "STUDENT" }))
        .await;
    assert_eq!(resp.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let users: Value = h.server.get("/api/v1/users").authorization_bearer(&h.admin).await.json();
    assert_eq!(users.as_array().unwrap().len(), 3);

    let updated: Value = h
        .server
        .patch(&format!("/api/v1/users/{id}"))
        .authorization_bearer(&h.admin)
        .json(&json!({ "is_active": false }))
        .await
        .json();
    assert_eq!(updated["is_active"], false);
    let resp = h
        .server
        .post("/api/v1/auth/login")
        .form(&[("username", "ana@school.org"), ("password", "pw")])
        .await;
    assert_eq!(resp.json::<Value>()["detail"], "Inactive user");

    let resp = h
        .server
        .delete(&format!("/api/v1/users/{}", h.admin_id))
        .authorization_bearer(&h.admin)
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = h.server.delete(&format!("/api/v1/users/{id}")).authorization_bearer(&h.admin).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let resp = h.server.get(&format!("/api/v1/users/{id}")).authorization_bearer(&h.admin).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(resp.json::<Value>()["detail"], "User not found");
}

#[tokio::test]
async fn test_groups_and_membership() {
    let h = harness().await;
    let (group, _, students) = classroom(&h, 2).await;

    let again: Value = h
        .server
        .post(&format!("/api/v1/groups/{group}/add-student/{}", students[0]))
        .authorization_bearer(&h.admin)
        .await
        .json();
    assert_eq!(again["message"], "Already in group");

    let resp = h
        .server
        .post(&format!("/api/v1/groups/{group}/add-student/9999"))
        .authorization_bearer(&h.admin)
        .await;
    assert_eq!(resp.json::<Value>()["detail"], "Student not found");

    let resp = h
        .server
        .delete(&format!("/api/v1/groups/{group}/students/{}", students[0]))
        .authorization_bearer(&h.admin)
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);

    let listed: Value = h
        .server
        .get(&format!("/api/v1/groups/{group}/students"))
        .authorization_bearer(&h.admin)
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let resp = h
        .server
        .post("/api/v1/groups")
        .authorization_bearer(&h.admin)
        .json(&json!({ "name": "   " }))
        .await;
    assert_eq!(resp.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = h.server.delete(&format!("/api/v1/groups/{group}")).authorization_bearer(&h.admin).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let sessions: Value = h.server.get("/api/v1/sessions").authorization_bearer(&h.admin).await.json();
    assert!(sessions.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_session_validation() {
    let h = harness().await;
    let (group, session, _) = classroom(&h, 0).await;

    let fetched: Value = h
        .server
        .get(&format!("/api/v1/sessions/{session}"))
        .authorization_bearer(&h.teacher)
        .await
        .json();
    assert_eq!(fetched["start_time"], "2025-01-06T08:00:00");

    let create = |body: Value| {
        h.server
            .post("/api/v1/sessions")
            .authorization_bearer(&h.admin)
            .json(&body)
    };

    let resp = create(json!({ "group_id": 999, "start_time": "2025-01-06T08:00", "end_time": "2025-01-06T09:00" })).await;
    assert_eq!(resp.json::<Value>()["detail"], "Group not found");

    let resp = create(json!({
        "group_id": group, "teacher_id": h.admin_id,
        "start_time": "2025-01-06T08:00", "end_time": "2025-01-06T09:00"
    }))
    .await;
    assert_eq!(resp.json::<Value>()["detail"], "Teacher not found");

    let resp = create(json!({ "group_id": group, "start_time": "2025-01-06T09:00", "end_time": "2025-01-06T09:00" })).await;
    assert_eq!(resp.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = h.server.get("/api/v1/sessions/4242").authorization_bearer(&h.teacher).await;
    assert_eq!(resp.json::<Value>()["detail"], "Session not found");
}

#[tokio::test]
async fn test_face_registration() {
    let h = harness().await;
    let (_, _, students) = classroom(&h, 1).await;

    let resp = register(&h, students[0], &[BLACK]).await;
    assert_eq!(resp.json::<Value>()["detail"], "No face detected");

    let resp = register(&h, students[0], &[RED, GREEN]).await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = h
        .server
        .post(&format!("/api/v1/face/register/{}", students[0]))
        .authorization_bearer(&h.admin)
        .multipart(upload(b"definitely not a png".to_vec()))
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = register(&h, students[0], &[RED]).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    assert_eq!(h.store.enrolled_user_ids().await.unwrap(), vec![students[0]]);
    let status: Value = h.server.get("/api/v1/face/status").await.json();
    assert_eq!(status["registered_faces"], 1);

    let resp = register(&h, 9999, &[RED]).await;
    assert_eq!(resp.json::<Value>()["detail"], "Student not found");

    let url = format!("/api/v1/face/register/{}", students[0]);
    let resp = h.server.delete(&url).authorization_bearer(&h.admin).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let resp = h.server.delete(&url).authorization_bearer(&h.admin).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mark_attendance_by_photo() {
    let h = harness().await;
    let (_, session, students) = classroom(&h, 3).await;
    register(&h, students[0], &[RED]).await;
    register(&h, students[1], &[GREEN]).await;

    let resp = mark_by_photo(&h, session, &[RED, BLACK, GREEN, BLUE]).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["session_id"], session);
    assert_eq!(body["faces_in_image"], 3);
    let recognized = body["recognized"].as_array().unwrap();
    assert_eq!(recognized.len(), 2);
    assert_eq!(recognized[0]["user_id"], students[0]);
    assert_eq!(recognized[0]["already_marked"], false);

    let body: Value = mark_by_photo(&h, session, &[GREEN]).await.json();
    assert_eq!(body["recognized"][0]["user_id"], students[1]);
    assert_eq!(body["recognized"][0]["already_marked"], true);

    let roster: Value = h
        .server
        .get(&format!("/api/v1/attendance/session/{session}"))
        .authorization_bearer(&h.teacher)
        .await
        .json();
    let statuses: Vec<&str> = roster["students"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["PRESENT", "PRESENT", "ABSENT"]);
    assert_eq!(roster["students"][0]["source"], "FACE");
}

#[tokio::test]
async fn test_duplicate_faces_collapse_to_best_match() {
    let h = harness().await;
    let (_, session, students) = classroom(&h, 1).await;
    register(&h, students[0], &[RED]).await;

    let body: Value = mark_by_photo(&h, session, &[[200, 60, 0], RED]).await.json();
    assert_eq!(body["faces_in_image"], 2);
    let recognized = body["recognized"].as_array().unwrap();
    assert_eq!(recognized.len(), 1);
    assert!((recognized[0]["similarity"].as_f64().unwrap() - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_mark_attendance_failures() {
    let h = harness().await;
    let resp = mark_by_photo(&h, 4242, &[RED]).await;
    assert_eq!(resp.json::<Value>()["detail"], "Session not found");

    let (_, empty_session, _) = classroom(&h, 0).await;
    let resp = mark_by_photo(&h, empty_session, &[RED]).await;
    assert_eq!(resp.json::<Value>()["detail"], "No students in this group");

    let h = harness().await;
    let (_, session, students) = classroom(&h, 2).await;
    let resp = mark_by_photo(&h, session, &[RED]).await;
    assert_eq!(resp.json::<Value>()["detail"], "No registered faces for this group");

    h.store.upsert_face(students[0], "not json".into()).await.unwrap();
    h.store.upsert_face(students[1], "[]".into()).await.unwrap();
    let resp = mark_by_photo(&h, session, &[RED]).await;
    assert_eq!(resp.json::<Value>()["detail"], "Invalid stored encodings; re-register faces");

    register(&h, students[0], &[RED]).await;
    let resp = mark_by_photo(&h, session, &[BLACK]).await;
    assert_eq!(resp.json::<Value>()["detail"], "No face detected");

    let resp = mark_by_photo(&h, session, &[BLUE]).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(resp.json::<Value>()["detail"], "No student recognized");
}

#[tokio::test]
async fn test_face_endpoints_without_engine() {
    let h = harness_with(false, None).await;
    let (_, session, students) = classroom(&h, 1).await;
    h.store.upsert_face(students[0], "[1.0, 0.0, 0.0]".into()).await.unwrap();

    let status: Value = h.server.get("/api/v1/face/status").await.json();
    assert_eq!(status["engine_loaded"], false);

    let resp = mark_by_photo(&h, session, &[RED]).await;
    assert_eq!(resp.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let resp = register(&h, students[0], &[RED]).await;
    assert_eq!(resp.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_manual_marking() {
    let h = harness().await;
    let (_, session, students) = classroom(&h, 2).await;
    let outsider = add_user(&h.store, "outsider@example.com", Role::Student, None).await;
    let url = |sid: i64| format!("/api/v1/attendance/session/{session}/students/{sid}");

    let body: Value = h.server.post(&url(students[0])).authorization_bearer(&h.teacher).await.json();
    assert_eq!(body["already_marked"], false);
    let body: Value = h.server.post(&url(students[0])).authorization_bearer(&h.teacher).await.json();
    assert_eq!(body["already_marked"], true);

    let resp = h.server.post(&url(outsider)).authorization_bearer(&h.teacher).await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = h
        .server
        .post(&format!("/api/v1/attendance/session/4242/students/{}", students[0]))
        .authorization_bearer(&h.teacher)
        .await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);

    let resp = h.server.delete(&url(students[0])).authorization_bearer(&h.teacher).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let resp = h.server.delete(&url(students[0])).authorization_bearer(&h.teacher).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export() {
    let h = harness().await;
    let (group, session, students) = classroom(&h, 2).await;
    h.server
        .post(&format!("/api/v1/attendance/session/{session}/students/{}", students[1]))
        .authorization_bearer(&h.teacher)
        .await;

    let resp = h.server.get("/api/v1/attendance/export").authorization_bearer(&h.teacher).await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.json::<Value>()["detail"], "session_id or group_id required");

    let resp = h
        .server
        .get("/api/v1/attendance/export")
        .add_query_param("session_id", session)
        .add_query_param("group_id", group)
        .authorization_bearer(&h.teacher)
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    assert_eq!(
        resp.header("content-disposition"),
        format!("attachment; filename=attendance_session_{session}.xlsx").as_str()
    );
    let mut workbook = zip::ZipArchive::new(Cursor::new(resp.as_bytes().to_vec())).unwrap();
    let mut strings = String::new();
    workbook
        .by_name("xl/sharedStrings.xml")
        .unwrap()
        .read_to_string(&mut strings)
        .unwrap();
    assert!(strings.contains("<t>PRESENT</t>"));
    assert!(strings.contains("<t>ABSENT</t>"));
    assert!(strings.contains("<t>student1@example.com</t>"));

    let resp = h
        .server
        .get("/api/v1/attendance/export")
        .add_query_param("group_id", group)
        .authorization_bearer(&h.admin)
        .await;
    assert_eq!(
        resp.header("content-disposition"),
        format!("attachment; filename=attendance_group_{group}.xlsx").as_str()
    );

    let resp = h
        .server
        .get("/api/v1/attendance/export")
        .add_query_param("group_id", group + 100)
        .authorization_bearer(&h.admin)
        .await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(resp.json::<Value>()["detail"], "No sessions found");
}

#[tokio::test]
async fn test_malformed_requests_answer_json() {
    let h = harness().await;

    let resp = h.server.get("/api/v1/users/abc").authorization_bearer(&h.admin).await;
    assert_eq!(resp.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.json::<Value>()["detail"].is_string());

    let resp = h
        .server
        .get("/api/v1/attendance/export")
        .add_query_param("session_id", "abc")
        .authorization_bearer(&h.teacher)
        .await;
    assert_eq!(resp.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.json::<Value>()["detail"].is_string());

    let resp = h.server.get("/api/v1/nope").authorization_bearer(&h.admin).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(resp.json::<Value>()["detail"], "Not Found");
}

#[tokio::test]
async fn test_trailing_slash_is_accepted() {
    let h = harness().await;
    let resp = h.server.get("/api/v1/users/").authorization_bearer(&h.admin).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().as_array().unwrap().len(), 2);

    let resp = h.server.get("/api/v1/face/status/").await;
    assert_eq!(resp.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_oversized_json_body_is_413() {
    let h = harness_with(true, Some(256)).await;
    let resp = h
        .server
        .post("/api/v1/groups")
        .authorization_bearer(&h.admin)
        .json(&json!({ "name": "x".repeat(1024) }))
        .await;
    assert_eq!(resp.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(resp.json::<Value>()["detail"], "Request body is too large");
}

#[tokio::test]
async fn test_tokens_stop_working_for_deactivated_and_deleted_users() {
    let h = harness().await;
    let paused = add_user(&h.store, "paused@example.com", Role::Teacher, Some("paused123")).await;
    let gone = add_user(&h.store, "gone@example.com", Role::Teacher, Some("gone123")).await;
    let paused_token = login(&h.server, "paused@example.com", "paused123").await;
    let gone_token = login(&h.server, "gone@example.com", "gone123").await;

    let resp = h
        .server
        .patch(&format!("/api/v1/users/{paused}"))
        .authorization_bearer(&h.admin)
        .json(&json!({ "is_active": false }))
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let resp = h.server.get("/api/v1/auth/me").authorization_bearer(&paused_token).await;
    assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json::<Value>()["detail"], "Inactive user");

    let resp = h.server.delete(&format!("/api/v1/users/{gone}")).authorization_bearer(&h.admin).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let resp = h.server.get("/api/v1/auth/me").authorization_bearer(&gone_token).await;
    assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json::<Value>()["detail"], "Inactive user");
}
