use axum::{
    Router, middleware,
    routing::{get, post},
};

use tower_governor::GovernorLayer;

use crate::middleware::rate_limit::public_rejection;
use crate::state::AppState;

use super::controller::{
    check_in, close_class_session, create_class_session, get_attendance_records,
    get_class_session, get_class_sessions, get_student_attendance_summary,
    issue_attendance_token, mark_attendance,
};

pub fn init_class_sessions_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_class_session).get(get_class_sessions))
        .route("/{id}", get(get_class_session))
        .route("/{id}/close", post(close_class_session))
        .route("/{id}/token", post(issue_attendance_token))
        .route(
            "/{id}/records",
            get(get_attendance_records).post(mark_attendance),
        )
}

/// Check-in is public and rate limited per client.
pub fn init_attendance_router(state: &AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/check-in", post(check_in))
        .route_layer(GovernorLayer::new(state.public_governor.clone()))
        .route_layer(middleware::map_response(public_rejection));

    Router::new()
        .route("/students/{id}/summary", get(get_student_attendance_summary))
        .merge(public_routes)
}
