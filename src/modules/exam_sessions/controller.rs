use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use examtrack_core::AppError;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{
    RequireExamSessionsCreate, RequireExamSessionsDelete, RequireExamSessionsRead,
    RequireExamSessionsUpdate, RequireTransfersRead,
};
use crate::state::AppState;
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    AssignInvigilatorDto, CreateExamSessionDto, CustodyChain, ExamSession,
    ExamSessionFilterParams, PaginatedExamSessionsResponse, UpdateExamSessionDto,
    UpdateExamSessionStatusDto,
};
use super::service::ExamSessionService;

#[utoipa::path(
    post,
    path = "/api/exam-sessions",
    request_body = CreateExamSessionDto,
    responses(
        (status = 201, description = "Exam session scheduled", body = ExamSession),
        (status = 400, description = "Invigilator is not an active invigilator"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires exam_sessions:create permission"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Exam Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_exam_session(
    State(state): State<AppState>,
    RequireExamSessionsCreate(auth_user): RequireExamSessionsCreate,
    ValidatedJson(dto): ValidatedJson<CreateExamSessionDto>,
) -> Result<(StatusCode, Json<ExamSession>), AppError> {
    let session =
        ExamSessionService::create_exam_session(&state.db, auth_user.user_id()?, dto).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/api/exam-sessions",
    params(ExamSessionFilterParams),
    responses(
        (status = 200, description = "Exam sessions ordered by start time", body = PaginatedExamSessionsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires exam_sessions:read permission")
    ),
    tag = "Exam Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_exam_sessions(
    State(state): State<AppState>,
    RequireExamSessionsRead(_auth_user): RequireExamSessionsRead,
    ValidatedQuery(filters): ValidatedQuery<ExamSessionFilterParams>,
) -> Result<Json<PaginatedExamSessionsResponse>, AppError> {
    let sessions = ExamSessionService::get_exam_sessions(&state.db, filters).await?;
    Ok(Json(sessions))
}

#[utoipa::path(
    get,
    path = "/api/exam-sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Exam session ID")
    ),
    responses(
        (status = 200, description = "Exam session details", body = ExamSession),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires exam_sessions:read permission"),
        (status = 404, description = "Exam session not found")
    ),
    tag = "Exam Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_exam_session(
    State(state): State<AppState>,
    RequireExamSessionsRead(_auth_user): RequireExamSessionsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<ExamSession>, AppError> {
    let session = ExamSessionService::get_exam_session(&state.db, id).await?;
    Ok(Json(session))
}

#[utoipa::path(
    put,
    path = "/api/exam-sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Exam session ID")
    ),
    request_body = UpdateExamSessionDto,
    responses(
        (status = 200, description = "Exam session updated", body = ExamSession),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires exam_sessions:update permission"),
        (status = 404, description = "Exam session not found"),
        (status = 409, description = "Exam session is no longer scheduled"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Exam Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_exam_session(
    State(state): State<AppState>,
    RequireExamSessionsUpdate(auth_user): RequireExamSessionsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateExamSessionDto>,
) -> Result<Json<ExamSession>, AppError> {
    let session =
        ExamSessionService::update_exam_session(&state.db, auth_user.user_id()?, id, dto).await?;
    Ok(Json(session))
}

#[utoipa::path(
    delete,
    path = "/api/exam-sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Exam session ID")
    ),
    responses(
        (status = 204, description = "Exam session deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires exam_sessions:delete permission"),
        (status = 404, description = "Exam session not found"),
        (status = 409, description = "Exam session has batch transfers")
    ),
    tag = "Exam Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_exam_session(
    State(state): State<AppState>,
    RequireExamSessionsDelete(auth_user): RequireExamSessionsDelete,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ExamSessionService::delete_exam_session(&state.db, auth_user.user_id()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/api/exam-sessions/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Exam session ID")
    ),
    request_body = UpdateExamSessionStatusDto,
    responses(
        (status = 200, description = "Status changed", body = ExamSession),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires exam_sessions:update permission"),
        (status = 404, description = "Exam session not found"),
        (status = 409, description = "Transition not allowed")
    ),
    tag = "Exam Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_exam_session_status(
    State(state): State<AppState>,
    RequireExamSessionsUpdate(auth_user): RequireExamSessionsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateExamSessionStatusDto>,
) -> Result<Json<ExamSession>, AppError> {
    let session =
        ExamSessionService::update_status(&state.db, auth_user.user_id()?, id, dto.status)
            .await?;
    Ok(Json(session))
}

#[utoipa::path(
    patch,
    path = "/api/exam-sessions/{id}/invigilator",
    params(
        ("id" = Uuid, Path, description = "Exam session ID")
    ),
    request_body = AssignInvigilatorDto,
    responses(
        (status = 200, description = "Invigilator assigned", body = ExamSession),
        (status = 400, description = "User is not an active invigilator"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires exam_sessions:update permission"),
        (status = 404, description = "Exam session not found"),
        (status = 409, description = "Exam session is completed or cancelled")
    ),
    tag = "Exam Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn assign_invigilator(
    State(state): State<AppState>,
    RequireExamSessionsUpdate(auth_user): RequireExamSessionsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<AssignInvigilatorDto>,
) -> Result<Json<ExamSession>, AppError> {
    let session =
        ExamSessionService::assign_invigilator(&state.db, auth_user.user_id()?, id, dto).await?;
    Ok(Json(session))
}

#[utoipa::path(
    get,
    path = "/api/exam-sessions/{id}/custody",
    params(
        ("id" = Uuid, Path, description = "Exam session ID")
    ),
    responses(
        (status = 200, description = "Chain of custody, oldest transfer first", body = CustodyChain),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires transfers:read permission"),
        (status = 404, description = "Exam session not found")
    ),
    tag = "Exam Sessions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_custody_chain(
    State(state): State<AppState>,
    RequireTransfersRead(_auth_user): RequireTransfersRead,
    Path(id): Path<Uuid>,
) -> Result<Json<CustodyChain>, AppError> {
    let chain = ExamSessionService::get_custody_chain(&state.db, id).await?;
    Ok(Json(chain))
}
