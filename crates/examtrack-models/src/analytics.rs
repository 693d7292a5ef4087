//! Reporting models.

use chrono::{DateTime, Utc};
use examtrack_core::serde::deserialize_optional_from_str;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::attendance::attendance_rate;

/// A `GROUP BY` bucket.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq, Eq)]
pub struct CountByKey {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsOverview {
    pub users_by_role: Vec<CountByKey>,
    pub active_users: i64,
    pub total_students: i64,
    pub exam_sessions_by_status: Vec<CountByKey>,
    pub transfers_by_status: Vec<CountByKey>,
    /// Confirmed transfers flagged with a discrepancy whose incident is still open
    pub open_discrepancies: i64,
    pub incidents_by_status: Vec<CountByKey>,
    pub incidents_by_severity: Vec<CountByKey>,
    pub attendance_rate: f64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceAnalyticsParams {
    /// Only count students of this department
    pub department: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CourseAttendanceStats {
    pub course_code: String,
    pub class_sessions: i64,
    pub records: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub excused: i64,
    #[sqlx(skip)]
    pub attendance_rate: f64,
}

impl CourseAttendanceStats {
    pub fn with_rate(mut self) -> Self {
        self.attendance_rate = attendance_rate(self.present + self.late, self.records);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TurnaroundParams {
    /// Number of sessions to return, slowest first (1-100, default 10)
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub limit: Option<i64>,
}

impl TurnaroundParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }
}

/// How long handlers take to acknowledge hand-overs for one exam session.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TransferTurnaround {
    pub exam_session_id: Uuid,
    pub course_code: String,
    pub confirmed_transfers: i64,
    pub avg_minutes: f64,
    pub max_minutes: f64,
}
