mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::{create_test_class_session, create_test_user, send, test_state_with};
use examtrack::examtrack_config::{AttendanceConfig, RateLimitConfig};
use examtrack::examtrack_models::UserRole;
use examtrack::router::init_router;
use serde_json::{Value, json};
use sqlx::PgPool;

/// One request per client, then a minute before the bucket refills.
fn strict_rate_limit_config() -> RateLimitConfig {
    RateLimitConfig {
        auth_per_second: 60,
        auth_burst_size: 1,
        public_per_second: 60,
        public_burst_size: 1,
    }
}

fn setup_strict_app(pool: PgPool) -> Router {
    init_router(test_state_with(
        pool,
        strict_rate_limit_config(),
        AttendanceConfig::default(),
    ))
}

fn request_from(client_ip: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", client_ip);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn login_from(client_ip: &str, email: &str) -> Request<Body> {
    request_from(
        client_ip,
        "/api/auth/login",
        None,
        json!({"email": email, "password": common::TEST_PASSWORD}),
    )
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_is_rate_limited(pool: PgPool) {
    let user = create_test_user(&pool, UserRole::Lecturer).await;
    let app = setup_strict_app(pool);

    let (status, _) = send(&app, login_from("203.0.113.10", &user.email)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, login_from("203.0.113.10", &user.email)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests, please slow down");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_limits_are_per_client(pool: PgPool) {
    let user = create_test_user(&pool, UserRole::Lecturer).await;
    let app = setup_strict_app(pool);

    let (status, _) = send(&app, login_from("203.0.113.10", &user.email)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, login_from("198.51.100.4", &user.email)).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_failed_logins_count_against_limit(pool: PgPool) {
    let user = create_test_user(&pool, UserRole::Lecturer).await;
    let app = setup_strict_app(pool);

    let (status, _) = send(
        &app,
        request_from(
            "203.0.113.10",
            "/api/auth/login",
            None,
            json!({"email": user.email, "password": "wrong-password"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, login_from("203.0.113.10", &user.email)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_authenticated_routes_are_not_limited(pool: PgPool) {
    let user = create_test_user(&pool, UserRole::Lecturer).await;
    let app = setup_strict_app(pool);

    for _ in 0..3 {
        let request = Request::builder()
            .method("GET")
            .uri("/api/auth/me")
            .header("x-forwarded-for", "203.0.113.10")
            .header("authorization", format!("Bearer {}", user.token))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_check_in_is_rate_limited(pool: PgPool) {
    let lecturer = create_test_user(&pool, UserRole::Lecturer).await;
    let session_id = create_test_class_session(&pool, lecturer.id, Utc::now()).await;
    let app = setup_strict_app(pool);

    let (status, issued) = send(
        &app,
        request_from(
            "203.0.113.10",
            &format!("/api/class-sessions/{}/token", session_id),
            Some(&lecturer.token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = issued["token"].as_str().unwrap();

    // Unknown student: the first attempt still spends the client's token.
    let check_in = |ip: &str| {
        request_from(
            ip,
            "/api/attendance/check-in",
            None,
            json!({"token": token, "matric_number": "NOPE/0000/000"}),
        )
    };

    let (status, _) = send(&app, check_in("198.51.100.7")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, check_in("198.51.100.7")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
