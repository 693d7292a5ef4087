use axum::{Json, extract::State};
use examtrack_core::AppError;
use tracing::instrument;

use crate::middleware::auth::RequireAnalyticsView;
use crate::state::AppState;
use crate::validator::ValidatedQuery;

use super::model::{
    AnalyticsOverview, AttendanceAnalyticsParams, CourseAttendanceStats, TransferTurnaround,
    TurnaroundParams,
};
use super::service::AnalyticsService;

#[utoipa::path(
    get,
    path = "/api/analytics/overview",
    responses(
        (status = 200, description = "System-wide counts", body = AnalyticsOverview),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires analytics:view permission")
    ),
    tag = "Analytics",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_overview(
    State(state): State<AppState>,
    RequireAnalyticsView(_auth_user): RequireAnalyticsView,
) -> Result<Json<AnalyticsOverview>, AppError> {
    let overview = AnalyticsService::get_overview(&state.db).await?;
    Ok(Json(overview))
}

#[utoipa::path(
    get,
    path = "/api/analytics/attendance",
    params(AttendanceAnalyticsParams),
    responses(
        (status = 200, description = "Attendance per course", body = [CourseAttendanceStats]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires analytics:view permission")
    ),
    tag = "Analytics",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_attendance_by_course(
    State(state): State<AppState>,
    RequireAnalyticsView(_auth_user): RequireAnalyticsView,
    ValidatedQuery(params): ValidatedQuery<AttendanceAnalyticsParams>,
) -> Result<Json<Vec<CourseAttendanceStats>>, AppError> {
    let stats = AnalyticsService::get_attendance_by_course(&state.db, params).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/analytics/transfer-turnaround",
    params(TurnaroundParams),
    responses(
        (status = 200, description = "Slowest exam sessions by hand-over time", body = [TransferTurnaround]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires analytics:view permission")
    ),
    tag = "Analytics",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_transfer_turnaround(
    State(state): State<AppState>,
    RequireAnalyticsView(_auth_user): RequireAnalyticsView,
    ValidatedQuery(params): ValidatedQuery<TurnaroundParams>,
) -> Result<Json<Vec<TransferTurnaround>>, AppError> {
    let turnaround = AnalyticsService::get_transfer_turnaround(&state.db, params).await?;
    Ok(Json(turnaround))
}
