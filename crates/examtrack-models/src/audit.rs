//! Audit trail models.

use chrono::{DateTime, Utc};
use examtrack_core::serde::deserialize_optional_uuid;
use examtrack_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// One state change, recorded in the same transaction as the change itself.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
pub struct AuditLog {
    pub id: Uuid,
    /// Acting user; absent for public check-ins and CLI actions
    pub actor_id: Option<Uuid>,
    #[schema(example = "transfer.confirm")]
    pub action: String,
    #[schema(example = "batch_transfer")]
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditLogFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub actor_id: Option<Uuid>,
    pub entity_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub entity_id: Option<Uuid>,
    pub action: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedAuditLogsResponse {
    pub data: Vec<AuditLog>,
    pub meta: PaginationMeta,
}
