use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use examtrack_core::AppError;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::{RequireIncidentsCreate, RequireIncidentsRead, RequireIncidentsUpdate};
use crate::middleware::role::RequireAdmin;
use crate::state::AppState;
use crate::validator::{ValidatedJson, ValidatedQuery};

use super::model::{
    AssignIncidentDto, CreateIncidentDto, Incident, IncidentFilterParams,
    PaginatedIncidentsResponse, UpdateIncidentDto, UpdateIncidentStatusDto,
};
use super::service::IncidentService;

#[utoipa::path(
    post,
    path = "/api/incidents",
    request_body = CreateIncidentDto,
    responses(
        (status = 201, description = "Incident reported", body = Incident),
        (status = 400, description = "Referenced record does not exist"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires incidents:create permission"),
        (status = 422, description = "Validation failed or no subject given")
    ),
    tag = "Incidents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn report_incident(
    State(state): State<AppState>,
    RequireIncidentsCreate(auth_user): RequireIncidentsCreate,
    ValidatedJson(dto): ValidatedJson<CreateIncidentDto>,
) -> Result<(StatusCode, Json<Incident>), AppError> {
    let incident =
        IncidentService::report_incident(&state.db, &state.events, auth_user.user_id()?, dto)
            .await?;
    Ok((StatusCode::CREATED, Json(incident)))
}

#[utoipa::path(
    get,
    path = "/api/incidents",
    params(IncidentFilterParams),
    responses(
        (status = 200, description = "Incidents, newest first", body = PaginatedIncidentsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires incidents:read permission")
    ),
    tag = "Incidents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_incidents(
    State(state): State<AppState>,
    RequireIncidentsRead(_auth_user): RequireIncidentsRead,
    ValidatedQuery(filters): ValidatedQuery<IncidentFilterParams>,
) -> Result<Json<PaginatedIncidentsResponse>, AppError> {
    let incidents = IncidentService::get_incidents(&state.db, filters).await?;
    Ok(Json(incidents))
}

#[utoipa::path(
    get,
    path = "/api/incidents/{id}",
    params(
        ("id" = Uuid, Path, description = "Incident ID")
    ),
    responses(
        (status = 200, description = "Incident details", body = Incident),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires incidents:read permission"),
        (status = 404, description = "Incident not found")
    ),
    tag = "Incidents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_incident(
    State(state): State<AppState>,
    RequireIncidentsRead(_auth_user): RequireIncidentsRead,
    Path(id): Path<Uuid>,
) -> Result<Json<Incident>, AppError> {
    let incident = IncidentService::get_incident(&state.db, id).await?;
    Ok(Json(incident))
}

#[utoipa::path(
    put,
    path = "/api/incidents/{id}",
    params(
        ("id" = Uuid, Path, description = "Incident ID")
    ),
    request_body = UpdateIncidentDto,
    responses(
        (status = 200, description = "Incident updated", body = Incident),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires incidents:update permission"),
        (status = 404, description = "Incident not found"),
        (status = 409, description = "Incident is resolved or dismissed"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Incidents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_incident(
    State(state): State<AppState>,
    RequireIncidentsUpdate(auth_user): RequireIncidentsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateIncidentDto>,
) -> Result<Json<Incident>, AppError> {
    let incident =
        IncidentService::update_incident(&state.db, &state.events, auth_user.user_id()?, id, dto)
            .await?;
    Ok(Json(incident))
}

#[utoipa::path(
    patch,
    path = "/api/incidents/{id}/assign",
    params(
        ("id" = Uuid, Path, description = "Incident ID")
    ),
    request_body = AssignIncidentDto,
    responses(
        (status = 200, description = "Investigator assigned", body = Incident),
        (status = 400, description = "Assignee is not an active user"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires incidents:update permission"),
        (status = 404, description = "Incident not found"),
        (status = 409, description = "Incident is resolved or dismissed")
    ),
    tag = "Incidents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn assign_incident(
    State(state): State<AppState>,
    RequireIncidentsUpdate(auth_user): RequireIncidentsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<AssignIncidentDto>,
) -> Result<Json<Incident>, AppError> {
    let incident =
        IncidentService::assign_incident(&state.db, &state.events, auth_user.user_id()?, id, dto)
            .await?;
    Ok(Json(incident))
}

#[utoipa::path(
    patch,
    path = "/api/incidents/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Incident ID")
    ),
    request_body = UpdateIncidentStatusDto,
    responses(
        (status = 200, description = "Status changed", body = Incident),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires incidents:update permission"),
        (status = 404, description = "Incident not found"),
        (status = 409, description = "Transition not allowed"),
        (status = 422, description = "Resolution notes missing")
    ),
    tag = "Incidents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_incident_status(
    State(state): State<AppState>,
    RequireIncidentsUpdate(auth_user): RequireIncidentsUpdate,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateIncidentStatusDto>,
) -> Result<Json<Incident>, AppError> {
    let incident =
        IncidentService::update_status(&state.db, &state.events, auth_user.user_id()?, id, dto)
            .await?;
    Ok(Json(incident))
}

#[utoipa::path(
    delete,
    path = "/api/incidents/{id}",
    params(
        ("id" = Uuid, Path, description = "Incident ID")
    ),
    responses(
        (status = 204, description = "Incident deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Incident not found")
    ),
    tag = "Incidents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_incident(
    State(state): State<AppState>,
    RequireAdmin(auth_user): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    IncidentService::delete_incident(&state.db, auth_user.user_id()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
