use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use examtrack_core::AppError;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{AuthUser, RequireAttendanceManage, RequireAttendanceRead};
use crate::middleware::role::check_owner_or_admin;
use crate::state::AppState;
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    AttendanceRecord, AttendanceRecordWithStudent, AttendanceTokenResponse, CheckInDto,
    CheckInResponse, ClassSession, ClassSessionFilterParams, CreateClassSessionDto,
    MarkAttendanceDto, PaginatedClassSessionsResponse, StudentAttendanceSummary,
};
use super::service::AttendanceService;

const NOT_LECTURER: &str = "Only the session lecturer or an administrator can do this";

/// Loads the session and checks the caller runs it.
async fn owned_session(
    state: &AppState,
    auth_user: &AuthUser,
    id: Uuid,
) -> Result<ClassSession, AppError> {
    let session = AttendanceService::get_class_session(&state.db, id).await?;
    check_owner_or_admin(auth_user, session.lecturer_id, NOT_LECTURER)?;
    Ok(session)
}

#[utoipa::path(
    post,
    path = "/api/class-sessions",
    request_body = CreateClassSessionDto,
    responses(
        (status = 201, description = "Class session opened", body = ClassSession),
        (status = 400, description = "Chosen lecturer is not an active lecturer"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires attendance:manage permission"),
        (status = 422, description = "Validation failed or ends_at not after starts_at")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_class_session(
    State(state): State<AppState>,
    RequireAttendanceManage(auth_user): RequireAttendanceManage,
    ValidatedJson(dto): ValidatedJson<CreateClassSessionDto>,
) -> Result<(StatusCode, Json<ClassSession>), AppError> {
    let session = AttendanceService::create_class_session(
        &state.db,
        auth_user.user_id()?,
        auth_user.is_admin(),
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/api/class-sessions",
    params(ClassSessionFilterParams),
    responses(
        (status = 200, description = "Class sessions, latest first", body = PaginatedClassSessionsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires attendance:read permission")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_class_sessions(
    State(state): State<AppState>,
    RequireAttendanceRead(_auth_user): RequireAttendanceRead,
    ValidatedQuery(filters): ValidatedQuery<ClassSessionFilterParams>,
) -> Result<Json<PaginatedClassSessionsResponse>, AppError> {
    let sessions = AttendanceService::get_class_sessions(&state.db, filters).await?;
    Ok(Json(sessions))
}

#[utoipa::path(
    get,
    path = "/api/class-sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Class session ID")
    ),
    responses(
        (status = 200, description = "Class session details", body = ClassSession),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires attendance:read permission"),
        (status = 404, description = "Class session not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_class_session(
    State(state): State<AppState>,
    RequireAttendanceRead(_auth_user): RequireAttendanceRead,
    Path(id): Path<Uuid>,
) -> Result<Json<ClassSession>, AppError> {
    let session = AttendanceService::get_class_session(&state.db, id).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/class-sessions/{id}/close",
    params(
        ("id" = Uuid, Path, description = "Class session ID")
    ),
    responses(
        (status = 200, description = "Class session closed", body = ClassSession),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the lecturer"),
        (status = 404, description = "Class session not found"),
        (status = 409, description = "Class session is already closed")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn close_class_session(
    State(state): State<AppState>,
    RequireAttendanceManage(auth_user): RequireAttendanceManage,
    Path(id): Path<Uuid>,
) -> Result<Json<ClassSession>, AppError> {
    owned_session(&state, &auth_user, id).await?;
    let session = AttendanceService::close_class_session(&state.db, auth_user.user_id()?, id).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/class-sessions/{id}/token",
    params(
        ("id" = Uuid, Path, description = "Class session ID")
    ),
    responses(
        (status = 200, description = "Registration token for the QR code", body = AttendanceTokenResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the lecturer"),
        (status = 404, description = "Class session not found"),
        (status = 409, description = "Class session is closed")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn issue_attendance_token(
    State(state): State<AppState>,
    RequireAttendanceManage(auth_user): RequireAttendanceManage,
    Path(id): Path<Uuid>,
) -> Result<Json<AttendanceTokenResponse>, AppError> {
    owned_session(&state, &auth_user, id).await?;
    let token = AttendanceService::issue_token(
        &state.db,
        &state.attendance_config,
        &state.jwt_config,
        id,
    )
    .await?;
    Ok(Json(token))
}

#[utoipa::path(
    get,
    path = "/api/class-sessions/{id}/records",
    params(
        ("id" = Uuid, Path, description = "Class session ID")
    ),
    responses(
        (status = 200, description = "Attendance records with student details", body = [AttendanceRecordWithStudent]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires attendance:read permission"),
        (status = 404, description = "Class session not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_attendance_records(
    State(state): State<AppState>,
    RequireAttendanceRead(_auth_user): RequireAttendanceRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AttendanceRecordWithStudent>>, AppError> {
    let records = AttendanceService::get_records(&state.db, id).await?;
    Ok(Json(records))
}

#[utoipa::path(
    post,
    path = "/api/class-sessions/{id}/records",
    params(
        ("id" = Uuid, Path, description = "Class session ID")
    ),
    request_body = MarkAttendanceDto,
    responses(
        (status = 200, description = "Attendance recorded", body = AttendanceRecord),
        (status = 400, description = "Student does not exist"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the lecturer"),
        (status = 404, description = "Class session not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn mark_attendance(
    State(state): State<AppState>,
    RequireAttendanceManage(auth_user): RequireAttendanceManage,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<MarkAttendanceDto>,
) -> Result<Json<AttendanceRecord>, AppError> {
    owned_session(&state, &auth_user, id).await?;
    let record =
        AttendanceService::mark_attendance(&state.db, auth_user.user_id()?, id, dto).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckInDto,
    responses(
        (status = 201, description = "Checked in", body = CheckInResponse),
        (status = 401, description = "Invalid or expired attendance token"),
        (status = 404, description = "Class session or student not found"),
        (status = 409, description = "Session closed or attendance already recorded"),
        (status = 422, description = "Validation failed"),
        (status = 429, description = "Too many requests")
    ),
    tag = "Attendance"
)]
#[instrument(skip(state, dto))]
pub async fn check_in(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CheckInDto>,
) -> Result<(StatusCode, Json<CheckInResponse>), AppError> {
    let response = AttendanceService::check_in(
        &state.db,
        &state.events,
        &state.attendance_config,
        &state.jwt_config,
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/attendance/students/{id}/summary",
    params(
        ("id" = Uuid, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Per-course attendance for the student", body = StudentAttendanceSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires attendance:read permission"),
        (status = 404, description = "Student not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student_attendance_summary(
    State(state): State<AppState>,
    RequireAttendanceRead(_auth_user): RequireAttendanceRead,
    Path(id): Path<Uuid>,
) -> Result<Json<StudentAttendanceSummary>, AppError> {
    let summary = AttendanceService::get_student_summary(&state.db, id).await?;
    Ok(Json(summary))
}
