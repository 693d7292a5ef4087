mod common;

use axum::Router;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{
    create_test_class_session, create_test_student, create_test_user, empty_request, json_request,
    send, setup_test_app,
};
use examtrack::examtrack_models::UserRole;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

async fn issue_token(app: &Router, token: &str, session_id: Uuid) -> (StatusCode, Value) {
    send(
        app,
        empty_request(
            "POST",
            &format!("/api/class-sessions/{}/token", session_id),
            Some(token),
        ),
    )
    .await
}

async fn check_in(app: &Router, attendance_token: &str, matric_number: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            "/api/attendance/check-in",
            None,
            json!({"token": attendance_token, "matric_number": matric_number}),
        ),
    )
    .await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_lecturer_creates_class_session(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let app = setup_test_app(pool);
    let starts_at = Utc::now();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/class-sessions",
            Some(&lecturer.token),
            json!({
                "course_code": "csc301",
                "course_title": "Operating Systems",
                "venue": "LT 2",
                "starts_at": starts_at,
                "ends_at": starts_at + Duration::hours(2),
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["course_code"], "CSC301");
    assert_eq!(body["lecturer_id"], lecturer.id.to_string());
    assert_eq!(body["status"], "open");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_class_session_must_end_after_start(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let app = setup_test_app(pool);
    let starts_at = Utc::now();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/class-sessions",
            Some(&lecturer.token),
            json!({
                "course_code": "CSC301",
                "course_title": "Operating Systems",
                "starts_at": starts_at,
                "ends_at": starts_at,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "ends_at must be after starts_at");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_faculty_officer_cannot_create_class_session(pool: PgPool) {
    let officer = create_test_user(&pool, UserRole::FacultyOfficer).await;
    let app = setup_test_app(pool);
    let starts_at = Utc::now();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/class-sessions",
            Some(&officer.token),
            json!({
                "course_code": "CSC301",
                "course_title": "Operating Systems",
                "starts_at": starts_at,
                "ends_at": starts_at + Duration::hours(1),
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_session_lecturer_issues_token(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let other = create_test_user(&pool, UserRole::Lecturer).await;
    let session_id = create_test_class_session(&pool, lecturer.id, Utc::now()).await;
    let app = setup_test_app(pool);

    let (status, body) = issue_token(&app, &other.token, session_id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Only the session lecturer or an administrator can do this"
    );

    let (status, body) = issue_token(&app, &lecturer.token, session_id).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert!(body["expires_at"].is_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_check_in_on_time(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let session_id = create_test_class_session(&pool, lecturer.id, Utc::now()).await;
    create_test_student(&pool, "CSC/2021/010").await;
    let app = setup_test_app(pool);

    let (_, issued) = issue_token(&app, &lecturer.token, session_id).await;
    let (status, body) = check_in(&app, issued["token"].as_str().unwrap(), "csc/2021/010").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["record"]["status"], "present");
    assert_eq!(body["record"]["method"], "qr");
    assert_eq!(body["course_code"], "CSC301");
    assert_eq!(body["student_name"], "Ada Obi");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_check_in_after_grace_is_late(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let session_id =
        create_test_class_session(&pool, lecturer.id, Utc::now() - Duration::hours(1)).await;
    create_test_student(&pool, "CSC/2021/011").await;
    let app = setup_test_app(pool);

    let (_, issued) = issue_token(&app, &lecturer.token, session_id).await;
    let (status, body) = check_in(&app, issued["token"].as_str().unwrap(), "CSC/2021/011").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["record"]["status"], "late");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_check_in_conflicts(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let session_id = create_test_class_session(&pool, lecturer.id, Utc::now()).await;
    create_test_student(&pool, "CSC/2021/012").await;
    let app = setup_test_app(pool);

    let (_, issued) = issue_token(&app, &lecturer.token, session_id).await;
    let token = issued["token"].as_str().unwrap();

    let (status, _) = check_in(&app, token, "CSC/2021/012").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = check_in(&app, token, "CSC/2021/012").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Attendance already recorded for this student");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_check_in_rejects_access_token(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    create_test_student(&pool, "CSC/2021/013").await;
    let app = setup_test_app(pool);

    let (status, body) = check_in(&app, &lecturer.token, "CSC/2021/013").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired attendance token");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_check_in_unknown_student(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let session_id = create_test_class_session(&pool, lecturer.id, Utc::now()).await;
    let app = setup_test_app(pool);

    let (_, issued) = issue_token(&app, &lecturer.token, session_id).await;
    let (status, body) = check_in(&app, issued["token"].as_str().unwrap(), "XYZ/0000/000").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Student not found");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_closed_session_refuses_check_in(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let session_id = create_test_class_session(&pool, lecturer.id, Utc::now()).await;
    create_test_student(&pool, "CSC/2021/014").await;
    let app = setup_test_app(pool);

    let (_, issued) = issue_token(&app, &lecturer.token, session_id).await;
    let close_uri = format!("/api/class-sessions/{}/close", session_id);

    let (status, body) = send(&app, empty_request("POST", &close_uri, Some(&lecturer.token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "closed");

    let (status, body) = send(&app, empty_request("POST", &close_uri, Some(&lecturer.token))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Class session is already closed");

    let (status, body) = check_in(&app, issued["token"].as_str().unwrap(), "CSC/2021/014").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Class session is closed");

    let (status, _) = issue_token(&app, &lecturer.token, session_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_manual_mark_overwrites_check_in(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let session_id =
        create_test_class_session(&pool, lecturer.id, Utc::now() - Duration::hours(1)).await;
    let student_id = create_test_student(&pool, "CSC/2021/015").await;
    let app = setup_test_app(pool);

    let (_, issued) = issue_token(&app, &lecturer.token, session_id).await;
    let (_, checked_in) = check_in(&app, issued["token"].as_str().unwrap(), "CSC/2021/015").await;
    assert_eq!(checked_in["record"]["status"], "late");

    let records_uri = format!("/api/class-sessions/{}/records", session_id);
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &records_uri,
            Some(&lecturer.token),
            json!({"student_id": student_id, "status": "excused"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "excused");
    assert_eq!(body["method"], "manual");
    assert_eq!(body["marked_by"], lecturer.id.to_string());

    let (status, body) = send(&app, empty_request("GET", &records_uri, Some(&lecturer.token))).await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["matric_number"], "CSC/2021/015");
    assert_eq!(records[0]["status"], "excused");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_mark_unknown_student(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let session_id = create_test_class_session(&pool, lecturer.id, Utc::now()).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/class-sessions/{}/records", session_id),
            Some(&lecturer.token),
            json!({"student_id": Uuid::new_v4(), "status": "present"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_summary(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let student_id = create_test_student(&pool, "CSC/2021/016").await;
    let app = setup_test_app(pool.clone());

    for (hours_ago, status) in [(72, "present"), (48, "late"), (24, "absent"), (1, "present")] {
        let session_id = create_test_class_session(
            &pool,
            lecturer.id,
            Utc::now() - Duration::hours(hours_ago),
        )
        .await;
        let (code, _) = send(
            &app,
            json_request(
                "POST",
                &format!("/api/class-sessions/{}/records", session_id),
                Some(&lecturer.token),
                json!({"student_id": student_id, "status": status}),
            ),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        empty_request(
            "GET",
            &format!("/api/attendance/students/{}/summary", student_id),
            Some(&lecturer.token),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matric_number"], "CSC/2021/016");
    let course = &body["courses"][0];
    assert_eq!(course["course_code"], "CSC301");
    assert_eq!(course["total"], 4);
    assert_eq!(course["present"], 2);
    assert_eq!(course["late"], 1);
    assert_eq!(course["absent"], 1);
    assert_eq!(course["attendance_rate"], 0.75);
}
