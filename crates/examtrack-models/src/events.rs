//! Domain events pushed to dashboards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod kinds {
    pub const TRANSFER_REQUESTED: &str = "transfer.requested";
    pub const TRANSFER_CONFIRMED: &str = "transfer.confirmed";
    pub const TRANSFER_REJECTED: &str = "transfer.rejected";
    pub const TRANSFER_CANCELLED: &str = "transfer.cancelled";
    pub const TRANSFER_DISCREPANCY: &str = "transfer.discrepancy";
    pub const INCIDENT_REPORTED: &str = "incident.reported";
    pub const INCIDENT_UPDATED: &str = "incident.updated";
    pub const ATTENDANCE_CHECKED_IN: &str = "attendance.checked_in";
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DomainEvent {
    pub id: Uuid,
    #[schema(example = "transfer.requested")]
    pub kind: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    /// Only this user receives the event; everyone does when absent
    pub recipient_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new<P: Serialize>(kind: &str, entity_type: &str, entity_id: Uuid, payload: &P) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            recipient_id: None,
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
            occurred_at: Utc::now(),
        }
    }

    pub fn to_recipient(mut self, recipient_id: Uuid) -> Self {
        self.recipient_id = Some(recipient_id);
        self
    }

    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.recipient_id.is_none_or(|r| r == user_id)
    }
}
