//! Exam session models.
//!
//! An exam session is one sitting of a course exam in a venue. Its scripts
//! move between handlers through batch transfers once the sitting is over.

use chrono::{DateTime, Duration, Utc};
use examtrack_core::serde::{deserialize_optional_from_str, deserialize_optional_uuid};
use examtrack_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::batch_transfers::{BatchTransfer, TransferStatus};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "exam_session_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExamSessionStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl ExamSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamSessionStatus::Scheduled => "scheduled",
            ExamSessionStatus::InProgress => "in_progress",
            ExamSessionStatus::Completed => "completed",
            ExamSessionStatus::Cancelled => "cancelled",
        }
    }

    /// Allowed lifecycle moves. Completed and cancelled are terminal.
    pub fn can_transition_to(self, next: ExamSessionStatus) -> bool {
        use ExamSessionStatus::*;
        matches!(
            (self, next),
            (Scheduled, InProgress) | (Scheduled, Cancelled) | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExamSessionStatus::Completed | ExamSessionStatus::Cancelled
        )
    }
}

impl fmt::Display for ExamSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct ExamSession {
    pub id: Uuid,
    #[schema(example = "CSC301")]
    pub course_code: String,
    pub course_title: String,
    pub department: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub expected_scripts: i32,
    pub status: ExamSessionStatus,
    pub invigilator_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExamSession {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateExamSessionDto {
    #[validate(length(min = 2, max = 20))]
    pub course_code: String,
    #[validate(length(min = 1, max = 255))]
    pub course_title: String,
    #[validate(length(min = 1, max = 150))]
    pub department: String,
    #[validate(length(min = 1, max = 150))]
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub expected_scripts: i32,
    pub invigilator_id: Option<Uuid>,
}

/// Partial update, accepted only while the session is scheduled.
#[derive(Deserialize, Debug, Clone, Default, ToSchema, Validate)]
pub struct UpdateExamSessionDto {
    #[validate(length(min = 2, max = 20))]
    pub course_code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub course_title: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub department: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub venue: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 0))]
    pub expected_scripts: Option<i32>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct UpdateExamSessionStatusDto {
    pub status: ExamSessionStatus,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct AssignInvigilatorDto {
    pub invigilator_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExamSessionFilterParams {
    pub status: Option<ExamSessionStatus>,
    pub department: Option<String>,
    pub course_code: Option<String>,
    /// Sessions starting at or after this instant
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub from: Option<DateTime<Utc>>,
    /// Sessions starting before this instant
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub to: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub invigilator_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedExamSessionsResponse {
    pub data: Vec<ExamSession>,
    pub meta: PaginationMeta,
}

/// Every hand-over of a session's scripts, oldest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct CustodyChain {
    pub exam_session_id: Uuid,
    /// Handler currently holding the scripts, if anyone does
    pub current_holder_id: Option<Uuid>,
    pub transfers: Vec<BatchTransfer>,
}

impl CustodyChain {
    /// Builds the chain from `transfers` ordered oldest first.
    ///
    /// The holder is the recipient of the latest confirmed transfer, or the
    /// session's invigilator before any hand-over was confirmed.
    pub fn new(session: &ExamSession, transfers: Vec<BatchTransfer>) -> Self {
        let current_holder_id = transfers
            .iter()
            .rev()
            .find(|t| t.status == TransferStatus::Confirmed)
            .map(|t| t.to_handler_id)
            .or(session.invigilator_id);

        Self {
            exam_session_id: session.id,
            current_holder_id,
            transfers,
        }
    }
}
