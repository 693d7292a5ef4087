mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{
    create_test_class_session, create_test_exam_session, create_test_student, create_test_user,
    empty_request, json_request, send, setup_test_app,
};
use examtrack::examtrack_models::UserRole;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test(migrations = "./migrations")]
async fn test_audit_log_records_user_creation(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let app = setup_test_app(pool);

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/api/users",
            Some(&admin.token),
            json!({
                "first_name": "Bola",
                "last_name": "Ade",
                "email": "bola.ade@uni.edu",
                "password": "password123",
                "role": "invigilator",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        empty_request(
            "GET",
            &format!("/api/audit-logs?entity_type=user&actor_id={}", admin.id),
            Some(&admin.token),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["action"], "user.create");
    assert_eq!(body["data"][0]["entity_id"], created["id"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_audit_log_requires_permission(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let head = create_test_user(&pool, UserRole::DepartmentHead).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        empty_request("GET", "/api/audit-logs", Some(&lecturer.token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, empty_request("GET", "/api/audit-logs", Some(&head.token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_overview_counts(pool: PgPool) {
    let head = create_test_user(&pool, UserRole::DepartmentHead).await;
    let invigilator = create_test_user(&pool, UserRole::Invigilator).await;
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    create_test_student(&pool, "CSC/2021/020").await;
    let session_id = create_test_exam_session(&pool, Some(invigilator.id)).await;
    let app = setup_test_app(pool);

    let (_, transfer) = send(
        &app,
        json_request(
            "POST",
            "/api/transfers",
            Some(&invigilator.token),
            json!({
                "exam_session_id": session_id,
                "to_handler_id": lecturer.id,
                "script_count": 40,
            }),
        ),
    )
    .await;
    send(
        &app,
        json_request(
            "POST",
            &format!("/api/transfers/{}/confirm", transfer["id"].as_str().unwrap()),
            Some(&lecturer.token),
            json!({"received_count": 38}),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        empty_request("GET", "/api/analytics/overview", Some(&head.token)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_users"], 3);
    assert_eq!(body["total_students"], 1);
    assert_eq!(body["open_discrepancies"], 1);
    assert_eq!(body["attendance_rate"], 0.0);

    let confirmed = body["transfers_by_status"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["key"] == "confirmed")
        .unwrap();
    assert_eq!(confirmed["count"], 1);

    let high = body["incidents_by_severity"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["key"] == "high")
        .unwrap();
    assert_eq!(high["count"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_attendance_by_course(pool: PgPool) {
    let head = create_test_user(&pool, UserRole::DepartmentHead).await;
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let first = create_test_student(&pool, "CSC/2021/021").await;
    let second = create_test_student(&pool, "CSC/2021/022").await;
    let session_id =
        create_test_class_session(&pool, lecturer.id, Utc::now() - Duration::hours(3)).await;
    create_test_class_session(&pool, lecturer.id, Utc::now() - Duration::hours(30)).await;
    let app = setup_test_app(pool);

    for (student_id, status) in [(first, "present"), (second, "absent")] {
        send(
            &app,
            json_request(
                "POST",
                &format!("/api/class-sessions/{}/records", session_id),
                Some(&lecturer.token),
                json!({"student_id": student_id, "status": status}),
            ),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        empty_request(
            "GET",
            "/api/analytics/attendance?department=Computer%20Science",
            Some(&head.token),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["course_code"], "CSC301");
    assert_eq!(rows[0]["class_sessions"], 2);
    assert_eq!(rows[0]["records"], 2);
    assert_eq!(rows[0]["present"], 1);
    assert_eq!(rows[0]["absent"], 1);
    assert_eq!(rows[0]["attendance_rate"], 0.5);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_transfer_turnaround(pool: PgPool) {
    let head = create_test_user(&pool, UserRole::DepartmentHead).await;
    let invigilator = create_test_user(&pool, UserRole::Invigilator).await;
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let session_id = create_test_exam_session(&pool, Some(invigilator.id)).await;

    let requested_at = Utc::now() - Duration::minutes(90);
    sqlx::query(
        r#"INSERT INTO batch_transfers
               (id, exam_session_id, from_handler_id, to_handler_id, script_count,
                received_count, status, requested_at, responded_at)
           VALUES ($1, $2, $3, $4, 40, 40, 'confirmed', $5, $6)"#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(invigilator.id)
    .bind(lecturer.id)
    .bind(requested_at)
    .bind(requested_at + Duration::minutes(30))
    .execute(&pool)
    .await
    .unwrap();

    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        empty_request(
            "GET",
            "/api/analytics/transfer-turnaround?limit=5",
            Some(&head.token),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["exam_session_id"], session_id.to_string());
    assert_eq!(rows[0]["confirmed_transfers"], 1);
    let avg = rows[0]["avg_minutes"].as_f64().unwrap();
    assert!((avg - 30.0).abs() < 0.01);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_analytics_requires_permission(pool: PgPool) {
    let invigilator = create_test_user(&pool, UserRole::Invigilator).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        empty_request("GET", "/api/analytics/overview", Some(&invigilator.token)),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
