//! Class attendance models.
//!
//! A lecturer opens a class session and shows a QR code holding a short-lived
//! registration token. Students check in by submitting the token with their
//! matric number; the lecturer can also mark records by hand.

use chrono::{DateTime, Duration, Utc};
use examtrack_core::serde::deserialize_optional_uuid;
use examtrack_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "class_session_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClassSessionStatus {
    Open,
    Closed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Excused => "excused",
        }
    }

    /// Present and late both count as attended.
    pub fn is_attended(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "attendance_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceMethod {
    Qr,
    Manual,
}

/// Longest grace period honoured; larger values are treated as a full day.
pub const MAX_LATE_GRACE_MINUTES: i64 = 24 * 60;

/// Status for a QR check-in made at `checked_in_at`.
pub fn check_in_status(
    starts_at: DateTime<Utc>,
    checked_in_at: DateTime<Utc>,
    grace_minutes: i64,
) -> AttendanceStatus {
    let grace = Duration::minutes(grace_minutes.clamp(0, MAX_LATE_GRACE_MINUTES));
    if checked_in_at > starts_at + grace {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

/// Share of attended records, in `[0, 1]`. Zero when nothing was recorded.
pub fn attendance_rate(attended: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        attended as f64 / total as f64
    }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct ClassSession {
    pub id: Uuid,
    pub course_code: String,
    pub course_title: String,
    pub lecturer_id: Uuid,
    pub venue: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: ClassSessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateClassSessionDto {
    #[validate(length(min = 2, max = 20))]
    pub course_code: String,
    #[validate(length(min = 1, max = 255))]
    pub course_title: String,
    #[validate(length(min = 1, max = 150))]
    pub venue: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Only honoured for admins; everyone else lectures their own session
    pub lecturer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClassSessionFilterParams {
    pub course_code: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub lecturer_id: Option<Uuid>,
    pub status: Option<ClassSessionStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedClassSessionsResponse {
    pub data: Vec<ClassSession>,
    pub meta: PaginationMeta,
}

/// Registration token to render as a QR code.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttendanceTokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CheckInDto {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "CSC/2021/001")]
    pub matric_number: String,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct MarkAttendanceDto {
    pub student_id: Uuid,
    pub status: AttendanceStatus,
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub class_session_id: Uuid,
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    pub method: AttendanceMethod,
    pub marked_by: Option<Uuid>,
    pub marked_at: DateTime<Utc>,
}

/// Attendance record joined with the student it belongs to.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
pub struct AttendanceRecordWithStudent {
    pub id: Uuid,
    pub class_session_id: Uuid,
    pub student_id: Uuid,
    pub matric_number: String,
    pub first_name: String,
    pub last_name: String,
    pub status: AttendanceStatus,
    pub method: AttendanceMethod,
    pub marked_by: Option<Uuid>,
    pub marked_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckInResponse {
    pub record: AttendanceRecord,
    pub course_code: String,
    pub student_name: String,
}

/// Per-course tallies for one student.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CourseAttendanceSummary {
    pub course_code: String,
    pub total: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub excused: i64,
    #[sqlx(skip)]
    pub attendance_rate: f64,
}

impl CourseAttendanceSummary {
    pub fn with_rate(mut self) -> Self {
        self.attendance_rate = attendance_rate(self.present + self.late, self.total);
        self
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StudentAttendanceSummary {
    pub student_id: Uuid,
    pub matric_number: String,
    pub courses: Vec<CourseAttendanceSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_within_grace_is_present() {
        let starts_at = Utc::now();
        assert_eq!(
            check_in_status(starts_at, starts_at + Duration::minutes(15), 15),
            AttendanceStatus::Present
        );
        assert_eq!(
            check_in_status(starts_at, starts_at - Duration::minutes(5), 15),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn test_check_in_after_grace_is_late() {
        let starts_at = Utc::now();
        assert_eq!(
            check_in_status(starts_at, starts_at + Duration::minutes(16), 15),
            AttendanceStatus::Late
        );
        assert_eq!(
            check_in_status(starts_at, starts_at + Duration::seconds(1), 0),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn test_huge_grace_is_capped_at_a_day() {
        let starts_at = Utc::now();
        assert_eq!(
            check_in_status(starts_at, starts_at + Duration::hours(23), i64::MAX),
            AttendanceStatus::Present
        );
        assert_eq!(
            check_in_status(starts_at, starts_at + Duration::hours(25), i64::MAX),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn test_attendance_rate() {
        assert_eq!(attendance_rate(0, 0), 0.0);
        assert_eq!(attendance_rate(3, 4), 0.75);
        assert_eq!(attendance_rate(5, 5), 1.0);
    }

    #[test]
    fn test_summary_rate_counts_late_as_attended() {
        let summary = CourseAttendanceSummary {
            course_code: "CSC301".to_string(),
            total: 10,
            present: 6,
            late: 2,
            absent: 1,
            excused: 1,
            attendance_rate: 0.0,
        }
        .with_rate();
        assert!((summary.attendance_rate - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_is_attended() {
        assert!(AttendanceStatus::Present.is_attended());
        assert!(AttendanceStatus::Late.is_attended());
        assert!(!AttendanceStatus::Absent.is_attended());
        assert!(!AttendanceStatus::Excused.is_attended());
    }

    #[test]
    fn test_check_in_dto_validation() {
        let dto = CheckInDto {
            token: String::new(),
            matric_number: "CSC/2021/001".to_string(),
        };
        assert!(dto.validate().is_err());
    }
}
