#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use examtrack::examtrack_auth::create_access_token;
use examtrack::examtrack_config::{AttendanceConfig, CorsConfig, JwtConfig, RateLimitConfig};
use examtrack::examtrack_core::hash_password;
use examtrack::examtrack_models::UserRole;
use examtrack::router::init_router;
use examtrack::state::AppState;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "testpass123";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test_secret_key_for_testing_purposes".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
    }
}

/// Oneshot requests carry no peer address, so the rate limiter keys on this.
pub const TEST_CLIENT_IP: &str = "127.0.0.1";

/// Bursts large enough that only the rate limit tests hit them.
pub fn relaxed_rate_limit_config() -> RateLimitConfig {
    RateLimitConfig {
        auth_per_second: 1,
        auth_burst_size: 1000,
        public_per_second: 1,
        public_burst_size: 1000,
    }
}

pub fn test_state(pool: PgPool) -> AppState {
    test_state_with(pool, relaxed_rate_limit_config(), AttendanceConfig::default())
}

pub fn test_state_with(
    pool: PgPool,
    rate_limit_config: RateLimitConfig,
    attendance_config: AttendanceConfig,
) -> AppState {
    AppState::new(
        pool,
        test_jwt_config(),
        CorsConfig {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        },
        rate_limit_config,
        attendance_config,
    )
    .unwrap()
}

pub fn setup_test_app(pool: PgPool) -> Router {
    init_router(test_state(pool))
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub token: String,
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub async fn create_test_user(pool: &PgPool, role: UserRole) -> TestUser {
    create_test_user_with(pool, role, &generate_unique_email(), true).await
}

pub async fn create_test_user_with(
    pool: &PgPool,
    role: UserRole,
    email: &str,
    is_active: bool,
) -> TestUser {
    let hashed = hash_password(TEST_PASSWORD).unwrap();

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO users (first_name, last_name, email, password, role, is_active)
           VALUES ('Test', 'User', $1, $2, $3, $4)
           RETURNING id"#,
    )
    .bind(email)
    .bind(hashed)
    .bind(role)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .unwrap();

    let token = create_access_token(
        id,
        email,
        role.as_str(),
        role.permission_strings(),
        &test_jwt_config(),
    )
    .unwrap();

    TestUser {
        id,
        email: email.to_string(),
        role,
        token,
    }
}

pub async fn create_test_student(pool: &PgPool, matric_number: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO students (matric_number, first_name, last_name, department, level)
           VALUES ($1, 'Ada', 'Obi', 'Computer Science', 300)
           RETURNING id"#,
    )
    .bind(matric_number)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_test_exam_session(pool: &PgPool, invigilator_id: Option<Uuid>) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO exam_sessions
               (course_code, course_title, department, venue, starts_at, duration_minutes,
                expected_scripts, invigilator_id)
           VALUES ('CSC301', 'Operating Systems', 'Computer Science', 'Hall A', $1, 120, 40, $2)
           RETURNING id"#,
    )
    .bind(Utc::now() + Duration::days(1))
    .bind(invigilator_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_test_class_session(
    pool: &PgPool,
    lecturer_id: Uuid,
    starts_at: DateTime<Utc>,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO class_sessions (course_code, course_title, lecturer_id, starts_at, ends_at)
           VALUES ('CSC301', 'Operating Systems', $1, $2, $3)
           RETURNING id"#,
    )
    .bind(lecturer_id)
    .bind(starts_at)
    .bind(starts_at + Duration::hours(2))
    .fetch_one(pool)
    .await
    .unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", TEST_CLIENT_IP);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", TEST_CLIENT_IP);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Sends `request` and returns the status and the JSON body (`Null` when empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}
