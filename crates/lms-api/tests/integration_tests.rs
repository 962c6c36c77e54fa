//! # Integration Tests for lms-api
//!
//! Drives the assembled router through the public API only: a seeded
//! directory, the full content arrangement workflow from draft to the
//! student view, notifications, chat, dashboards, CSV export, the security
//! log, health probes and the OpenAPI document.

use std::io::Write;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use lms_api::state::{AppConfig, AppState};

const SECRET: &str = "integration-secret";

const CS: &str = "0d000000-0000-4000-8000-000000000001";
const PHYSICS: &str = "0d000000-0000-4000-8000-000000000002";
const DEAN: &str = "0e000000-0000-4000-8000-000000000001";
const HOD: &str = "0e000000-0000-4000-8000-000000000002";
const PHYSICS_HOD: &str = "0e000000-0000-4000-8000-000000000003";
const CC: &str = "0e000000-0000-4000-8000-000000000004";
const TEACHER: &str = "0e000000-0000-4000-8000-000000000005";
const STUDENT: &str = "0e000000-0000-4000-8000-000000000006";
const OUTSIDER: &str = "0e000000-0000-4000-8000-000000000007";

fn seed_yaml() -> String {
    format!(
        r#"
departments:
  - id: "{CS}"
    name: Computer Science
    school: Engineering
  - id: "{PHYSICS}"
    name: Physics
    school: Science
users:
  - id: "{DEAN}"
    name: Dana Dean
    email: dean@uni.example
    role: dean
  - id: "{HOD}"
    name: Harriet Hod
    email: hod.cs@uni.example
    role: hod
    department: Computer Science
  - id: "{PHYSICS_HOD}"
    name: Otto Hod
    email: hod.physics@uni.example
    role: hod
    department: Physics
  - id: "{CC}"
    name: Cora Coordinator
    email: cora@uni.example
    role: cc
    department: Computer Science
  - id: "{TEACHER}"
    name: Theo Teacher
    email: theo@uni.example
    role: teacher
    department: Computer Science
  - id: "{STUDENT}"
    name: Sam Student
    email: sam@uni.example
    role: student
    department: Computer Science
  - id: "{OUTSIDER}"
    name: Olive Outsider
    email: olive@uni.example
    role: student
    department: Computer Science
"#
    )
}

/// Seeded state with authentication enabled.
fn seeded_state() -> (AppState, tempfile::NamedTempFile) {
    let mut seed = tempfile::NamedTempFile::new().unwrap();
    seed.write_all(seed_yaml().as_bytes()).unwrap();
    let config = AppConfig {
        auth_token: Some(SECRET.to_string()),
        seed_file: Some(seed.path().to_path_buf()),
        ..AppConfig::default()
    };
    let state = lms_api::bootstrap::bootstrap(config, None).unwrap();
    (state, seed)
}

fn bearer(role: &str, user: &str) -> String {
    format!("{role}:{user}:{SECRET}")
}

async fn call(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn call_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = call(app, method, uri, token, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

// -- Health & OpenAPI ---------------------------------------------------------

#[tokio::test]
async fn test_health_probes_without_credentials() {
    let (state, _seed) = seeded_state();
    let app = lms_api::app(state);

    let (status, body) = call(&app, "GET", "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");

    let (status, body) = call(&app, "GET", "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ready");
}

#[tokio::test]
async fn test_openapi_spec_is_served() {
    let (state, _seed) = seeded_state();
    let app = lms_api::app(state);

    let (status, _) = call_json(&app, "GET", "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, spec) = call_json(&app, "GET", "/openapi.json", Some(SECRET), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(spec["info"]["title"], "LMS API");
    assert!(spec["paths"]["/v1/courses/{course_id}/arrangement/submit"]["post"].is_object());
}

// -- Arrangement Workflow -----------------------------------------------------

#[tokio::test]
async fn test_arrangement_workflow_end_to_end() {
    let (state, _seed) = seeded_state();
    let app = lms_api::app(state);
    let hod = bearer("hod", HOD);
    let cc = bearer("cc", CC);
    let student = bearer("student", STUDENT);

    // HOD creates the course with a coordinator.
    let (status, course) = call_json(
        &app,
        "POST",
        "/v1/courses",
        Some(&hod),
        Some(json!({
            "code": "cs101",
            "title": "Intro to Programming",
            "department_id": CS,
            "coordinator_id": CC,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{course}");
    assert_eq!(course["code"], "CS101");
    assert_eq!(course["state"], "DRAFT");
    assert_eq!(course["arrangement"]["state"], "OPEN");
    assert_eq!(course["arrangement"]["version"], 0);
    let course_id = course["id"].as_str().unwrap().to_string();
    let base = format!("/v1/courses/{course_id}/arrangement");

    // Submitting an empty arrangement is refused.
    let (status, _) = call_json(&app, "POST", &format!("{base}/submit"), Some(&cc), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Coordinator adds three items.
    for (kind, title, duration) in [
        ("video", "Welcome", Some(300)),
        ("document", "Syllabus", None),
        ("video", "Variables", Some(900)),
    ] {
        let (status, body) = call_json(
            &app,
            "POST",
            &format!("{base}/items"),
            Some(&cc),
            Some(json!({
                "kind": kind,
                "title": title,
                "url": format!("https://cdn.uni.example/{}", title.to_lowercase()),
                "duration_secs": duration,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    // Students cannot edit.
    let (status, _) = call_json(
        &app,
        "POST",
        &format!("{base}/move"),
        Some(&student),
        Some(json!({ "from": 0, "to": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Drag the syllabus to the front.
    let (status, arrangement) = call_json(
        &app,
        "POST",
        &format!("{base}/move"),
        Some(&cc),
        Some(json!({ "from": 1, "to": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = arrangement["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Syllabus", "Welcome", "Variables"]);
    assert_eq!(arrangement["total_video_secs"], 1200);

    // First submission is version 1.
    let (status, submitted) =
        call_json(&app, "POST", &format!("{base}/submit"), Some(&cc), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["state"], "SUBMITTED");
    assert_eq!(submitted["version"], 1);

    // Editing is locked while under review.
    let (status, _) = call_json(
        &app,
        "POST",
        &format!("{base}/move"),
        Some(&cc),
        Some(json!({ "from": 0, "to": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Another department's HOD cannot review.
    let (status, _) = call_json(
        &app,
        "POST",
        &format!("{base}/approve"),
        Some(&bearer("hod", PHYSICS_HOD)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Rejecting needs remarks.
    let (status, _) = call_json(
        &app,
        "POST",
        &format!("{base}/reject"),
        Some(&hod),
        Some(json!({ "remarks": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, rejected) = call_json(
        &app,
        "POST",
        &format!("{base}/reject"),
        Some(&hod),
        Some(json!({ "remarks": "Put the welcome video first" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["state"], "REJECTED");

    // Launching without an approved version fails.
    let (status, _) = call_json(
        &app,
        "POST",
        &format!("/v1/courses/{course_id}/launch"),
        Some(&hod),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Coordinator reopens, fixes the order and resubmits as version 2.
    let (status, reopened) =
        call_json(&app, "POST", &format!("{base}/reopen"), Some(&cc), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["state"], "OPEN");
    let (status, _) = call_json(
        &app,
        "POST",
        &format!("{base}/move"),
        Some(&cc),
        Some(json!({ "from": 1, "to": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, resubmitted) =
        call_json(&app, "POST", &format!("{base}/submit"), Some(&cc), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resubmitted["version"], 2);

    let (status, approved) = call_json(
        &app,
        "POST",
        &format!("{base}/approve"),
        Some(&hod),
        Some(json!({ "remarks": "Looks good" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["state"], "APPROVED");
    assert_eq!(approved["published_version"], 2);

    // History keeps both versions and every transition.
    let (status, history) =
        call_json(&app, "GET", &format!("{base}/history"), Some(&hod), None).await;
    assert_eq!(status, StatusCode::OK);
    let versions = history["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["outcome"], "REJECTED");
    assert_eq!(versions[0]["remarks"], "Put the welcome video first");
    assert_eq!(versions[1]["outcome"], "APPROVED");
    assert_eq!(history["transitions"].as_array().unwrap().len(), 5);

    // A section with the student enrolled, then launch.
    let (status, section) = call_json(
        &app,
        "POST",
        "/v1/sections",
        Some(&hod),
        Some(json!({ "course_id": course_id, "name": "A", "teacher_id": TEACHER })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let section_id = section["id"].as_str().unwrap().to_string();
    let (status, _) = call_json(
        &app,
        "POST",
        &format!("/v1/sections/{section_id}/students"),
        Some(&hod),
        Some(json!({ "student_ids": [STUDENT] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Not visible to students before launch.
    let content_uri = format!("/v1/courses/{course_id}/content");
    let (status, _) = call_json(&app, "GET", &content_uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, launched) = call_json(
        &app,
        "POST",
        &format!("/v1/courses/{course_id}/launch"),
        Some(&hod),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(launched["state"], "LAUNCHED");
    assert_eq!(launched["launched_version"], 2);

    // The enrolled student sees the approved order.
    let (status, content) = call_json(&app, "GET", &content_uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content["version"], 2);
    let titles: Vec<&str> = content["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Welcome", "Syllabus", "Variables"]);

    // A student outside the section does not.
    let (status, _) = call_json(
        &app,
        "GET",
        &content_uri,
        Some(&bearer("student", OUTSIDER)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Revising after launch leaves the published version in place.
    let (status, _) = call_json(&app, "POST", &format!("{base}/reopen"), Some(&cc), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call_json(
        &app,
        "POST",
        &format!("{base}/move"),
        Some(&cc),
        Some(json!({ "from": 2, "to": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, content) = call_json(&app, "GET", &content_uri, Some(&student), None).await;
    assert_eq!(content["version"], 2);
    assert_eq!(content["items"][0]["title"], "Welcome");
}

// -- Notifications ------------------------------------------------------------

#[tokio::test]
async fn test_workflow_notifications_reach_each_party() {
    let (state, _seed) = seeded_state();
    let app = lms_api::app(state);
    let hod = bearer("hod", HOD);
    let cc = bearer("cc", CC);

    let (_, course) = call_json(
        &app,
        "POST",
        "/v1/courses",
        Some(&hod),
        Some(json!({
            "code": "CS200",
            "title": "Data Structures",
            "department_id": CS,
            "coordinator_id": CC,
        })),
    )
    .await;
    let course_id = course["id"].as_str().unwrap().to_string();
    let base = format!("/v1/courses/{course_id}/arrangement");
    call_json(
        &app,
        "POST",
        &format!("{base}/items"),
        Some(&cc),
        Some(json!({
            "kind": "document",
            "title": "Notes",
            "url": "https://cdn.uni.example/notes.pdf",
        })),
    )
    .await;
    call_json(&app, "POST", &format!("{base}/submit"), Some(&cc), None).await;

    // The CS HOD is told; the Physics HOD is not.
    let (status, inbox) = call_json(&app, "GET", "/v1/notifications", Some(&hod), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["kind"], "arrangement_submitted");
    assert_eq!(inbox[0]["read"], false);
    let (_, other) = call_json(
        &app,
        "GET",
        "/v1/notifications",
        Some(&bearer("hod", PHYSICS_HOD)),
        None,
    )
    .await;
    assert!(other.as_array().unwrap().is_empty());

    call_json(&app, "POST", &format!("{base}/approve"), Some(&hod), None).await;
    let (_, inbox) = call_json(&app, "GET", "/v1/notifications?unread=true", Some(&cc), None).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["kind"], "arrangement_approved");

    let id = inbox[0]["id"].as_str().unwrap();
    let (status, read) = call_json(
        &app,
        "POST",
        &format!("/v1/notifications/{id}/read"),
        Some(&cc),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["read"], true);

    // Someone else's notification reads as missing.
    let (status, _) = call_json(
        &app,
        "POST",
        &format!("/v1/notifications/{id}/read"),
        Some(&hod),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, marked) =
        call_json(&app, "POST", "/v1/notifications/read-all", Some(&hod), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["marked"], 1);
}

// -- Chat, Dashboards & Export ------------------------------------------------

#[tokio::test]
async fn test_section_chat_dashboards_and_export() {
    let (state, _seed) = seeded_state();
    let app = lms_api::app(state);
    let hod = bearer("hod", HOD);
    let teacher = bearer("teacher", TEACHER);
    let student = bearer("student", STUDENT);

    let (_, course) = call_json(
        &app,
        "POST",
        "/v1/courses",
        Some(&hod),
        Some(json!({ "code": "CS300", "title": "Algorithms, Part I", "department_id": CS })),
    )
    .await;
    let course_id = course["id"].as_str().unwrap().to_string();
    let (_, section) = call_json(
        &app,
        "POST",
        "/v1/sections",
        Some(&hod),
        Some(json!({ "course_id": course_id, "name": "B", "teacher_id": TEACHER })),
    )
    .await;
    let section_id = section["id"].as_str().unwrap().to_string();
    call_json(
        &app,
        "POST",
        &format!("/v1/sections/{section_id}/students"),
        Some(&hod),
        Some(json!({ "student_ids": [STUDENT] })),
    )
    .await;

    // Chat between section members.
    let messages = format!("/v1/sections/{section_id}/messages");
    let (status, _) = call_json(
        &app,
        "POST",
        &messages,
        Some(&teacher),
        Some(json!({ "body": "Welcome!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = call_json(
        &app,
        "POST",
        &messages,
        Some(&student),
        Some(json!({ "body": "Thanks" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = call_json(
        &app,
        "POST",
        &messages,
        Some(&bearer("student", OUTSIDER)),
        Some(json!({ "body": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, thread) = call_json(&app, "GET", &messages, Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    let bodies: Vec<&str> = thread
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, ["Welcome!", "Thanks"]);

    // Dashboards.
    let (status, teacher_view) =
        call_json(&app, "GET", "/v1/analytics/teacher", Some(&teacher), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(teacher_view["total_students"], 1);

    let (status, dept) = call_json(
        &app,
        "GET",
        &format!("/v1/analytics/department/{CS}"),
        Some(&hod),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dept["name"], "Computer Science");

    let (status, _) = call_json(&app, "GET", "/v1/analytics/school", Some(&hod), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, school) = call_json(
        &app,
        "GET",
        "/v1/analytics/school",
        Some(&bearer("dean", DEAN)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(school["departments"].as_array().unwrap().len(), 2);

    // CSV exports.
    let (status, roster) = call(
        &app,
        "GET",
        &format!("/v1/export/sections/{section_id}/students.csv"),
        Some(&teacher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(roster).unwrap(),
        format!("id,name,email\r\n{STUDENT},Sam Student,sam@uni.example\r\n")
    );

    let (status, catalogue) = call(&app, "GET", "/v1/export/courses.csv", Some(&hod), None).await;
    assert_eq!(status, StatusCode::OK);
    let catalogue = String::from_utf8(catalogue).unwrap();
    assert!(catalogue.contains("CS300,\"Algorithms, Part I\",Computer Science,DRAFT,OPEN,0,0\r\n"));
}

// -- Authentication & Security Log --------------------------------------------

#[tokio::test]
async fn test_rejected_requests_are_logged_for_the_dean() {
    let (state, _seed) = seeded_state();
    let app = lms_api::app(state);

    let (status, body) = call_json(&app, "GET", "/v1/courses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = call_json(
        &app,
        "GET",
        "/v1/courses",
        Some(&format!("hod:{HOD}:wrong")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call_json(
        &app,
        "POST",
        "/v1/departments",
        Some(&bearer("student", STUDENT)),
        Some(json!({ "name": "History", "school": "Humanities" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, attempts) = call_json(
        &app,
        "GET",
        "/v1/security/attempts",
        Some(&bearer("dean", DEAN)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let attempts = attempts.as_array().unwrap();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0]["kind"], "forbidden");
    assert_eq!(attempts[0]["path"], "/v1/departments");

    // The secret never appears in the log.
    let raw = serde_json::to_string(attempts).unwrap();
    assert!(!raw.contains(SECRET));
    assert!(!raw.contains("wrong"));
}

#[tokio::test]
async fn test_metrics_snapshot() {
    let (state, _seed) = seeded_state();
    let app = lms_api::app(state);
    call_json(&app, "GET", "/v1/departments", Some(&bearer("teacher", TEACHER)), None).await;

    let (status, metrics) =
        call_json(&app, "GET", "/metrics", Some(&bearer("dean", DEAN)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["requests"], 1);
    assert_eq!(metrics["server_errors"], 0);
}
