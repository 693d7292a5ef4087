use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use examtrack_core::AppError;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{
    RequireTransfersRead, RequireTransfersRequest, RequireTransfersRespond,
};
use crate::state::AppState;
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    BatchTransfer, ConfirmTransferDto, PaginatedTransfersResponse, RejectTransferDto,
    ReportDiscrepancyDto, RequestTransferDto, TransferFilterParams,
};
use super::service::BatchTransferService;

#[utoipa::path(
    post,
    path = "/api/transfers",
    request_body = RequestTransferDto,
    responses(
        (status = 201, description = "Hand-over requested", body = BatchTransfer),
        (status = 400, description = "Recipient is the requester or not an active handler"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller does not hold the scripts"),
        (status = 404, description = "Exam session not found"),
        (status = 409, description = "Session cancelled or a transfer is already pending"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Batch Transfers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn request_transfer(
    State(state): State<AppState>,
    RequireTransfersRequest(auth_user): RequireTransfersRequest,
    ValidatedJson(dto): ValidatedJson<RequestTransferDto>,
) -> Result<(StatusCode, Json<BatchTransfer>), AppError> {
    let transfer = BatchTransferService::request_transfer(
        &state.db,
        &state.events,
        auth_user.user_id()?,
        auth_user.is_admin(),
        dto,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

#[utoipa::path(
    get,
    path = "/api/transfers",
    params(TransferFilterParams),
    responses(
        (status = 200, description = "Transfers, newest first", body = PaginatedTransfersResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires transfers:read permission")
    ),
    tag = "Batch Transfers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_transfers(
    State(state): State<AppState>,
    RequireTransfersRead(auth_user): RequireTransfersRead,
    ValidatedQuery(filters): ValidatedQuery<TransferFilterParams>,
) -> Result<Json<PaginatedTransfersResponse>, AppError> {
    let transfers =
        BatchTransferService::get_transfers(&state.db, auth_user.user_id()?, filters).await?;
    Ok(Json(transfers))
}

#[utoipa::path(
    get,
    path = "/api/transfers/{id}",
    params(
        ("id" = Uuid, Path, description = "Batch transfer ID")
    ),
    responses(
        (status = 200, description = "Transfer details", body = BatchTransfer),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires transfers:read permission"),
        (status = 404, description = "Batch transfer not found")
    ),
    tag = "Batch Transfers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_transfer(
    State(state): State<AppState>,
    RequireTransfersRead(_auth_user): RequireTransfersRead,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchTransfer>, AppError> {
    let transfer = BatchTransferService::get_transfer(&state.db, id).await?;
    Ok(Json(transfer))
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/confirm",
    params(
        ("id" = Uuid, Path, description = "Batch transfer ID")
    ),
    request_body = ConfirmTransferDto,
    responses(
        (status = 200, description = "Receipt confirmed; a count mismatch opens an incident", body = BatchTransfer),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the recipient"),
        (status = 404, description = "Batch transfer not found"),
        (status = 409, description = "Transfer is not pending")
    ),
    tag = "Batch Transfers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn confirm_transfer(
    State(state): State<AppState>,
    RequireTransfersRespond(auth_user): RequireTransfersRespond,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<ConfirmTransferDto>,
) -> Result<Json<BatchTransfer>, AppError> {
    let transfer = BatchTransferService::confirm_transfer(
        &state.db,
        &state.events,
        auth_user.user_id()?,
        id,
        dto,
    )
    .await?;
    Ok(Json(transfer))
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/reject",
    params(
        ("id" = Uuid, Path, description = "Batch transfer ID")
    ),
    request_body = RejectTransferDto,
    responses(
        (status = 200, description = "Transfer rejected", body = BatchTransfer),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the recipient"),
        (status = 404, description = "Batch transfer not found"),
        (status = 409, description = "Transfer is not pending"),
        (status = 422, description = "Reason is required")
    ),
    tag = "Batch Transfers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn reject_transfer(
    State(state): State<AppState>,
    RequireTransfersRespond(auth_user): RequireTransfersRespond,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<RejectTransferDto>,
) -> Result<Json<BatchTransfer>, AppError> {
    let transfer = BatchTransferService::reject_transfer(
        &state.db,
        &state.events,
        auth_user.user_id()?,
        id,
        dto,
    )
    .await?;
    Ok(Json(transfer))
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Batch transfer ID")
    ),
    responses(
        (status = 200, description = "Transfer cancelled", body = BatchTransfer),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the sender"),
        (status = 404, description = "Batch transfer not found"),
        (status = 409, description = "Transfer is not pending")
    ),
    tag = "Batch Transfers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_transfer(
    State(state): State<AppState>,
    RequireTransfersRequest(auth_user): RequireTransfersRequest,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchTransfer>, AppError> {
    let transfer = BatchTransferService::cancel_transfer(
        &state.db,
        &state.events,
        auth_user.user_id()?,
        auth_user.is_admin(),
        id,
    )
    .await?;
    Ok(Json(transfer))
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/discrepancy",
    params(
        ("id" = Uuid, Path, description = "Batch transfer ID")
    ),
    request_body = ReportDiscrepancyDto,
    responses(
        (status = 200, description = "Discrepancy recorded and incident opened", body = BatchTransfer),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a party to the transfer"),
        (status = 404, description = "Batch transfer not found"),
        (status = 409, description = "Transfer is not confirmed"),
        (status = 422, description = "Note is required")
    ),
    tag = "Batch Transfers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn report_discrepancy(
    State(state): State<AppState>,
    RequireTransfersRespond(auth_user): RequireTransfersRespond,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<ReportDiscrepancyDto>,
) -> Result<Json<BatchTransfer>, AppError> {
    let transfer = BatchTransferService::report_discrepancy(
        &state.db,
        &state.events,
        auth_user.user_id()?,
        auth_user.is_admin(),
        id,
        dto,
    )
    .await?;
    Ok(Json(transfer))
}
