//! Incident models.

use chrono::{DateTime, Utc};
use examtrack_core::serde::deserialize_optional_uuid;
use examtrack_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "incident_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Malpractice,
    ScriptDiscrepancy,
    MissingScript,
    LateSubmission,
    Impersonation,
    Other,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "incident_severity", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "incident_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    UnderInvestigation,
    Resolved,
    Dismissed,
}

impl IncidentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::Malpractice => "malpractice",
            IncidentType::ScriptDiscrepancy => "script_discrepancy",
            IncidentType::MissingScript => "missing_script",
            IncidentType::LateSubmission => "late_submission",
            IncidentType::Impersonation => "impersonation",
            IncidentType::Other => "other",
        }
    }
}

impl IncidentSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSeverity::Low => "low",
            IncidentSeverity::Medium => "medium",
            IncidentSeverity::High => "high",
            IncidentSeverity::Critical => "critical",
        }
    }
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "open",
            IncidentStatus::UnderInvestigation => "under_investigation",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Dismissed => "dismissed",
        }
    }

    pub fn can_transition_to(self, next: IncidentStatus) -> bool {
        use IncidentStatus::*;
        matches!(
            (self, next),
            (Open, UnderInvestigation)
                | (Open, Resolved)
                | (Open, Dismissed)
                | (UnderInvestigation, Resolved)
                | (UnderInvestigation, Dismissed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::Dismissed)
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Incident {
    pub id: Uuid,
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    pub title: String,
    pub description: String,
    pub student_id: Option<Uuid>,
    pub exam_session_id: Option<Uuid>,
    pub batch_transfer_id: Option<Uuid>,
    pub reported_by: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateIncidentDto {
    pub incident_type: IncidentType,
    /// Defaults to `medium`
    pub severity: Option<IncidentSeverity>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    pub student_id: Option<Uuid>,
    pub exam_session_id: Option<Uuid>,
    pub batch_transfer_id: Option<Uuid>,
}

impl CreateIncidentDto {
    /// An incident must concern a student, an exam session or a transfer.
    pub fn has_subject(&self) -> bool {
        self.student_id.is_some() || self.exam_session_id.is_some() || self.batch_transfer_id.is_some()
    }
}

/// Edits to the report itself; not allowed once resolved or dismissed.
#[derive(Deserialize, Debug, Clone, Default, ToSchema, Validate)]
pub struct UpdateIncidentDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,
    pub severity: Option<IncidentSeverity>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct AssignIncidentDto {
    pub assigned_to: Uuid,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct UpdateIncidentStatusDto {
    pub status: IncidentStatus,
    /// Required when resolving or dismissing
    #[validate(length(min = 1, max = 5000))]
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IncidentFilterParams {
    pub status: Option<IncidentStatus>,
    pub severity: Option<IncidentSeverity>,
    pub incident_type: Option<IncidentType>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub exam_session_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub batch_transfer_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedIncidentsResponse {
    pub data: Vec<Incident>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use IncidentStatus::*;

    fn dto() -> CreateIncidentDto {
        CreateIncidentDto {
            incident_type: IncidentType::Malpractice,
            severity: None,
            title: "Phone found in exam hall".to_string(),
            description: "Candidate had notes on a phone".to_string(),
            student_id: None,
            exam_session_id: None,
            batch_transfer_id: None,
        }
    }

    #[test]
    fn test_incident_needs_a_subject() {
        assert!(!dto().has_subject());
        assert!(
            CreateIncidentDto {
                student_id: Some(Uuid::new_v4()),
                ..dto()
            }
            .has_subject()
        );
        assert!(
            CreateIncidentDto {
                batch_transfer_id: Some(Uuid::new_v4()),
                ..dto()
            }
            .has_subject()
        );
    }

    #[test]
    fn test_status_transitions() {
        assert!(Open.can_transition_to(UnderInvestigation));
        assert!(Open.can_transition_to(Resolved));
        assert!(Open.can_transition_to(Dismissed));
        assert!(UnderInvestigation.can_transition_to(Resolved));
        assert!(UnderInvestigation.can_transition_to(Dismissed));

        assert!(!UnderInvestigation.can_transition_to(Open));
        assert!(!Resolved.can_transition_to(Open));
        assert!(!Dismissed.can_transition_to(UnderInvestigation));
        assert!(!Open.can_transition_to(Open));
    }

    #[test]
    fn test_terminal_states() {
        assert!(Resolved.is_terminal());
        assert!(Dismissed.is_terminal());
        assert!(!Open.is_terminal());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(IncidentSeverity::Critical > IncidentSeverity::High);
        assert!(IncidentSeverity::Low < IncidentSeverity::Medium);
    }

    #[test]
    fn test_create_dto_validation() {
        assert!(dto().validate().is_ok());
        let empty_title = CreateIncidentDto {
            title: String::new(),
            ..dto()
        };
        assert!(empty_title.validate().is_err());
    }

    #[test]
    fn test_type_serde() {
        let t: IncidentType = serde_json::from_str(r#""script_discrepancy""#).unwrap();
        assert_eq!(t, IncidentType::ScriptDiscrepancy);
    }
}
