use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use examtrack_core::{ErrorResponse, PaginationMeta, PaginationParams};

use crate::modules::analytics::model::{
    AnalyticsOverview, CountByKey, CourseAttendanceStats, TransferTurnaround,
};
use crate::modules::attendance::model::{
    AttendanceMethod, AttendanceRecord, AttendanceRecordWithStudent, AttendanceStatus,
    AttendanceTokenResponse, CheckInDto, CheckInResponse, ClassSession, ClassSessionStatus,
    CourseAttendanceSummary, CreateClassSessionDto, MarkAttendanceDto,
    PaginatedClassSessionsResponse, StudentAttendanceSummary,
};
use crate::modules::audit::model::{AuditLog, PaginatedAuditLogsResponse};
use crate::modules::auth::model::{
    ChangePasswordDto, LoginRequest, LoginResponse, MessageResponse, RefreshTokenRequest,
};
use crate::modules::batch_transfers::model::{
    BatchTransfer, ConfirmTransferDto, PaginatedTransfersResponse, RejectTransferDto,
    ReportDiscrepancyDto, RequestTransferDto, TransferDirection, TransferStatus,
};
use crate::modules::exam_sessions::model::{
    AssignInvigilatorDto, CreateExamSessionDto, CustodyChain, ExamSession, ExamSessionStatus,
    PaginatedExamSessionsResponse, UpdateExamSessionDto, UpdateExamSessionStatusDto,
};
use crate::modules::incidents::model::{
    AssignIncidentDto, CreateIncidentDto, Incident, IncidentSeverity, IncidentStatus,
    IncidentType, PaginatedIncidentsResponse, UpdateIncidentDto, UpdateIncidentStatusDto,
};
use crate::modules::students::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, UpdateStudentDto,
};
use crate::modules::users::model::{
    CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserRole,
};
use examtrack_models::DomainEvent;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::refresh_token,
        crate::modules::auth::controller::get_current_user,
        crate::modules::auth::controller::change_password,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::get_handlers,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::get_student_by_matric,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::exam_sessions::controller::create_exam_session,
        crate::modules::exam_sessions::controller::get_exam_sessions,
        crate::modules::exam_sessions::controller::get_exam_session,
        crate::modules::exam_sessions::controller::update_exam_session,
        crate::modules::exam_sessions::controller::delete_exam_session,
        crate::modules::exam_sessions::controller::update_exam_session_status,
        crate::modules::exam_sessions::controller::assign_invigilator,
        crate::modules::exam_sessions::controller::get_custody_chain,
        crate::modules::batch_transfers::controller::request_transfer,
        crate::modules::batch_transfers::controller::get_transfers,
        crate::modules::batch_transfers::controller::get_transfer,
        crate::modules::batch_transfers::controller::confirm_transfer,
        crate::modules::batch_transfers::controller::reject_transfer,
        crate::modules::batch_transfers::controller::cancel_transfer,
        crate::modules::batch_transfers::controller::report_discrepancy,
        crate::modules::incidents::controller::report_incident,
        crate::modules::incidents::controller::get_incidents,
        crate::modules::incidents::controller::get_incident,
        crate::modules::incidents::controller::update_incident,
        crate::modules::incidents::controller::assign_incident,
        crate::modules::incidents::controller::update_incident_status,
        crate::modules::incidents::controller::delete_incident,
        crate::modules::attendance::controller::create_class_session,
        crate::modules::attendance::controller::get_class_sessions,
        crate::modules::attendance::controller::get_class_session,
        crate::modules::attendance::controller::close_class_session,
        crate::modules::attendance::controller::issue_attendance_token,
        crate::modules::attendance::controller::get_attendance_records,
        crate::modules::attendance::controller::mark_attendance,
        crate::modules::attendance::controller::check_in,
        crate::modules::attendance::controller::get_student_attendance_summary,
        crate::modules::audit::controller::get_audit_logs,
        crate::modules::analytics::controller::get_overview,
        crate::modules::analytics::controller::get_attendance_by_course,
        crate::modules::analytics::controller::get_transfer_turnaround,
        crate::modules::events::controller::stream_events,
    ),
    components(
        schemas(
            ErrorResponse,
            PaginationMeta,
            PaginationParams,
            LoginRequest,
            LoginResponse,
            RefreshTokenRequest,
            ChangePasswordDto,
            MessageResponse,
            User,
            UserRole,
            CreateUserDto,
            UpdateUserDto,
            PaginatedUsersResponse,
            Student,
            CreateStudentDto,
            UpdateStudentDto,
            PaginatedStudentsResponse,
            ExamSession,
            ExamSessionStatus,
            CreateExamSessionDto,
            UpdateExamSessionDto,
            UpdateExamSessionStatusDto,
            AssignInvigilatorDto,
            PaginatedExamSessionsResponse,
            CustodyChain,
            BatchTransfer,
            TransferStatus,
            TransferDirection,
            RequestTransferDto,
            ConfirmTransferDto,
            RejectTransferDto,
            ReportDiscrepancyDto,
            PaginatedTransfersResponse,
            Incident,
            IncidentType,
            IncidentSeverity,
            IncidentStatus,
            CreateIncidentDto,
            UpdateIncidentDto,
            AssignIncidentDto,
            UpdateIncidentStatusDto,
            PaginatedIncidentsResponse,
            ClassSession,
            ClassSessionStatus,
            CreateClassSessionDto,
            PaginatedClassSessionsResponse,
            AttendanceStatus,
            AttendanceMethod,
            AttendanceRecord,
            AttendanceRecordWithStudent,
            AttendanceTokenResponse,
            CheckInDto,
            CheckInResponse,
            MarkAttendanceDto,
            CourseAttendanceSummary,
            StudentAttendanceSummary,
            AuditLog,
            PaginatedAuditLogsResponse,
            AnalyticsOverview,
            CountByKey,
            CourseAttendanceStats,
            TransferTurnaround,
            DomainEvent,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, token refresh and password changes"),
        (name = "Users", description = "Staff accounts and handler lookup"),
        (name = "Students", description = "Student records"),
        (name = "Exam Sessions", description = "Exam sessions and chain of custody"),
        (name = "Batch Transfers", description = "Hand-over of exam scripts between handlers"),
        (name = "Incidents", description = "Malpractice and discrepancy reports"),
        (name = "Attendance", description = "Class sessions, QR check-in and attendance records"),
        (name = "Audit", description = "Audit trail of state changes"),
        (name = "Analytics", description = "Dashboard reporting"),
        (name = "Events", description = "Live event stream")
    ),
    info(
        title = "ExamTrack API",
        version = "0.1.0",
        description = "Exam logistics and class attendance API built with Rust, Axum, and PostgreSQL.",
        contact(
            name = "API Support",
            email = "support@examtrack.dev"
        ),
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_paths_and_security() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/transfers/{id}/confirm"));
        assert!(doc.paths.paths.contains_key("/api/attendance/check-in"));
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("CustodyChain"));
    }
}
