//! Batch transfer models.
//!
//! A batch transfer records exam scripts moving from one handler to another.
//! The sender requests it, the recipient confirms (optionally with a count
//! that differs from what was sent) or rejects it.

use chrono::{DateTime, Utc};
use examtrack_core::serde::{deserialize_optional_from_str, deserialize_optional_uuid};
use examtrack_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::incidents::IncidentSeverity;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "transfer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Confirmed => "confirmed",
            TransferStatus::Rejected => "rejected",
            TransferStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a transfer the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// Transfers addressed to the caller
    Incoming,
    /// Transfers sent by the caller
    Outgoing,
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct BatchTransfer {
    pub id: Uuid,
    pub exam_session_id: Uuid,
    pub from_handler_id: Uuid,
    pub to_handler_id: Uuid,
    pub script_count: i32,
    pub received_count: Option<i32>,
    pub status: TransferStatus,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub has_discrepancy: bool,
    pub discrepancy_note: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Mismatch between the number of scripts sent and received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub expected: i32,
    pub received: i32,
}

impl Discrepancy {
    /// Returns `None` when the counts agree.
    pub fn between(expected: i32, received: i32) -> Option<Self> {
        (expected != received).then_some(Self { expected, received })
    }

    pub fn missing(&self) -> i32 {
        (self.expected - self.received).max(0)
    }

    /// Missing scripts are more serious than surplus ones.
    pub fn severity(&self) -> IncidentSeverity {
        if self.received < self.expected {
            IncidentSeverity::High
        } else {
            IncidentSeverity::Medium
        }
    }

    pub fn default_note(&self) -> String {
        format!(
            "Expected {} scripts, received {}",
            self.expected, self.received
        )
    }
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct RequestTransferDto {
    pub exam_session_id: Uuid,
    pub to_handler_id: Uuid,
    #[validate(range(min = 1))]
    #[schema(example = 120)]
    pub script_count: i32,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema, Validate)]
pub struct ConfirmTransferDto {
    /// Scripts actually received; defaults to the number sent
    #[validate(range(min = 0))]
    pub received_count: Option<i32>,
    #[validate(length(min = 1, max = 2000))]
    pub discrepancy_note: Option<String>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct RejectTransferDto {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct ReportDiscrepancyDto {
    #[validate(range(min = 0))]
    pub received_count: Option<i32>,
    #[validate(length(min = 1, max = 2000))]
    pub note: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransferFilterParams {
    pub status: Option<TransferStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub exam_session_id: Option<Uuid>,
    pub direction: Option<TransferDirection>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub has_discrepancy: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedTransfersResponse {
    pub data: Vec<BatchTransfer>,
    pub meta: PaginationMeta,
}
