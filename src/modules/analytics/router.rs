use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{get_attendance_by_course, get_overview, get_transfer_turnaround};

pub fn init_analytics_router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(get_overview))
        .route("/attendance", get(get_attendance_by_course))
        .route("/transfer-turnaround", get(get_transfer_turnaround))
}
