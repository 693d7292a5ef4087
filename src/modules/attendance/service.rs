//! Class sessions, QR registration tokens and attendance records.
//!
//! Students check in without an account: the signed token from the QR code
//! names the class session, the matric number names the student. Each student
//! has at most one record per session; a manual mark overwrites it.

use chrono::{DateTime, Utc};
use examtrack_auth::{create_attendance_token, verify_attendance_token};
use examtrack_config::{AttendanceConfig, JwtConfig};
use examtrack_core::{AppError, PaginationMeta};
use examtrack_models::DomainEvent;
use examtrack_models::events::kinds;
use serde_json::json;
use sqlx::{Executor, PgPool, Postgres};
use tracing::instrument;
use uuid::Uuid;

use crate::events::EventBus;
use crate::metrics::track_attendance_check_in;
use crate::modules::audit::service::{AuditEntry, AuditService};
use crate::modules::students::service::StudentService;
use crate::modules::users::model::UserRole;
use crate::modules::users::service::UserService;

use super::model::{
    AttendanceMethod, AttendanceRecord, AttendanceRecordWithStudent, AttendanceTokenResponse,
    CheckInDto, CheckInResponse, ClassSession, ClassSessionFilterParams, ClassSessionStatus,
    CourseAttendanceSummary, CreateClassSessionDto, MarkAttendanceDto,
    PaginatedClassSessionsResponse, StudentAttendanceSummary, check_in_status,
};

fn not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Class session not found"))
}

fn require_open(session: &ClassSession) -> Result<(), AppError> {
    if session.status == ClassSessionStatus::Closed {
        return Err(AppError::conflict(anyhow::anyhow!("Class session is closed")));
    }
    Ok(())
}

/// Lecturer of a new session: the caller, or the admin's pick.
fn resolve_lecturer(actor_id: Uuid, is_admin: bool, requested: Option<Uuid>) -> Uuid {
    match requested {
        Some(lecturer_id) if is_admin => lecturer_id,
        _ => actor_id,
    }
}

pub struct AttendanceService;

impl AttendanceService {
    #[instrument(skip(db))]
    pub async fn create_class_session(
        db: &PgPool,
        actor_id: Uuid,
        is_admin: bool,
        dto: CreateClassSessionDto,
    ) -> Result<ClassSession, AppError> {
        if dto.ends_at <= dto.starts_at {
            return Err(AppError::unprocessable(anyhow::anyhow!(
                "ends_at must be after starts_at"
            )));
        }

        let lecturer_id = resolve_lecturer(actor_id, is_admin, dto.lecturer_id);

        let mut tx = db.begin().await?;

        if lecturer_id != actor_id {
            UserService::require_active_with_role(
                &mut *tx,
                lecturer_id,
                &[UserRole::Lecturer, UserRole::DepartmentHead],
                "Lecturer must be an active lecturer or department head",
            )
            .await?;
        }

        let session = sqlx::query_as::<_, ClassSession>(
            r#"INSERT INTO class_sessions (course_code, course_title, lecturer_id, venue, starts_at, ends_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, course_code, course_title, lecturer_id, venue, starts_at, ends_at,
                         status, created_at, updated_at"#,
        )
        .bind(dto.course_code.trim().to_uppercase())
        .bind(dto.course_title.trim())
        .bind(lecturer_id)
        .bind(&dto.venue)
        .bind(dto.starts_at)
        .bind(dto.ends_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, "Class session already exists"))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "class_session.create", "class_session", session.id)
                .details(json!({
                    "course_code": session.course_code,
                    "lecturer_id": session.lecturer_id,
                })),
        )
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    #[instrument(skip(db))]
    pub async fn get_class_sessions(
        db: &PgPool,
        filters: ClassSessionFilterParams,
    ) -> Result<PaginatedClassSessionsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let course_code = filters
            .course_code
            .as_deref()
            .map(|c| c.trim().to_uppercase());

        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM class_sessions
               WHERE ($1::text IS NULL OR course_code = $1)
                 AND ($2::uuid IS NULL OR lecturer_id = $2)
                 AND ($3::class_session_status IS NULL OR status = $3)"#,
        )
        .bind(&course_code)
        .bind(filters.lecturer_id)
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        let sessions = sqlx::query_as::<_, ClassSession>(
            r#"SELECT id, course_code, course_title, lecturer_id, venue, starts_at, ends_at,
                      status, created_at, updated_at
               FROM class_sessions
               WHERE ($1::text IS NULL OR course_code = $1)
                 AND ($2::uuid IS NULL OR lecturer_id = $2)
                 AND ($3::class_session_status IS NULL OR status = $3)
               ORDER BY starts_at DESC, id
               LIMIT $4 OFFSET $5"#,
        )
        .bind(&course_code)
        .bind(filters.lecturer_id)
        .bind(filters.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedClassSessionsResponse {
            data: sessions,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_class_session(db: &PgPool, id: Uuid) -> Result<ClassSession, AppError> {
        Self::find(db, id, false).await?.ok_or_else(not_found)
    }

    async fn find<'e, E>(
        executor: E,
        id: Uuid,
        for_update: bool,
    ) -> Result<Option<ClassSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = if for_update {
            r#"SELECT id, course_code, course_title, lecturer_id, venue, starts_at, ends_at,
                      status, created_at, updated_at
               FROM class_sessions WHERE id = $1 FOR UPDATE"#
        } else {
            r#"SELECT id, course_code, course_title, lecturer_id, venue, starts_at, ends_at,
                      status, created_at, updated_at
               FROM class_sessions WHERE id = $1"#
        };

        let session = sqlx::query_as::<_, ClassSession>(query)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(session)
    }

    #[instrument(skip(db))]
    pub async fn close_class_session(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
    ) -> Result<ClassSession, AppError> {
        let mut tx = db.begin().await?;

        let current = Self::find(&mut *tx, id, true).await?.ok_or_else(not_found)?;
        if current.status == ClassSessionStatus::Closed {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Class session is already closed"
            )));
        }

        let session = sqlx::query_as::<_, ClassSession>(
            r#"UPDATE class_sessions SET status = 'closed', updated_at = NOW()
               WHERE id = $1
               RETURNING id, course_code, course_title, lecturer_id, venue, starts_at, ends_at,
                         status, created_at, updated_at"#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "class_session.close", "class_session", id),
        )
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    /// Signs a registration token for an open session.
    #[instrument(skip(db, jwt_config))]
    pub async fn issue_token(
        db: &PgPool,
        attendance_config: &AttendanceConfig,
        jwt_config: &JwtConfig,
        id: Uuid,
    ) -> Result<AttendanceTokenResponse, AppError> {
        let session = Self::get_class_session(db, id).await?;
        require_open(&session)?;

        let (token, exp) =
            create_attendance_token(session.id, attendance_config.token_ttl_seconds, jwt_config)?;

        let expires_at = DateTime::<Utc>::from_timestamp(exp as i64, 0)
            .ok_or_else(|| AppError::internal_error("Invalid token expiry".to_string()))?;

        tracing::info!(class_session_id = %session.id, %expires_at, "Attendance token issued");

        Ok(AttendanceTokenResponse { token, expires_at })
    }

    #[instrument(skip(db, events, jwt_config, dto), fields(matric_number = %dto.matric_number))]
    pub async fn check_in(
        db: &PgPool,
        events: &EventBus,
        attendance_config: &AttendanceConfig,
        jwt_config: &JwtConfig,
        dto: CheckInDto,
    ) -> Result<CheckInResponse, AppError> {
        let session_id = verify_attendance_token(&dto.token, jwt_config)?;

        let mut tx = db.begin().await?;

        let session = Self::find(&mut *tx, session_id, false)
            .await?
            .ok_or_else(not_found)?;
        require_open(&session)?;

        let student = StudentService::find_by_matric(&mut *tx, &dto.matric_number)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        let status = check_in_status(
            session.starts_at,
            Utc::now(),
            attendance_config.late_grace_minutes,
        );

        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"INSERT INTO attendance_records (class_session_id, student_id, status, method)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (class_session_id, student_id) DO NOTHING
               RETURNING id, class_session_id, student_id, status, method, marked_by, marked_at"#,
        )
        .bind(session.id)
        .bind(student.id)
        .bind(status)
        .bind(AttendanceMethod::Qr)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::conflict(anyhow::anyhow!(
                "Attendance already recorded for this student"
            ))
        })?;

        AuditService::record(
            &mut *tx,
            AuditEntry {
                actor_id: None,
                action: "attendance.check_in",
                entity_type: "attendance_record",
                entity_id: Some(record.id),
                details: json!({
                    "class_session_id": session.id,
                    "student_id": student.id,
                    "status": record.status,
                }),
            },
        )
        .await?;

        tx.commit().await?;

        track_attendance_check_in(record.status.as_str());
        events.publish(DomainEvent::new(
            kinds::ATTENDANCE_CHECKED_IN,
            "attendance_record",
            record.id,
            &json!({
                "class_session_id": session.id,
                "course_code": session.course_code,
                "student_id": student.id,
                "matric_number": student.matric_number,
                "status": record.status,
            }),
        ));

        Ok(CheckInResponse {
            record,
            course_code: session.course_code,
            student_name: format!("{} {}", student.first_name, student.last_name),
        })
    }

    /// Records or overwrites a student's attendance by hand.
    #[instrument(skip(db))]
    pub async fn mark_attendance(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        dto: MarkAttendanceDto,
    ) -> Result<AttendanceRecord, AppError> {
        let mut tx = db.begin().await?;

        Self::find(&mut *tx, id, false).await?.ok_or_else(not_found)?;

        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"INSERT INTO attendance_records (class_session_id, student_id, status, method, marked_by)
               VALUES ($1, $2, $3, 'manual', $4)
               ON CONFLICT (class_session_id, student_id) DO UPDATE SET
                   status = EXCLUDED.status,
                   method = EXCLUDED.method,
                   marked_by = EXCLUDED.marked_by,
                   marked_at = NOW()
               RETURNING id, class_session_id, student_id, status, method, marked_by, marked_at"#,
        )
        .bind(id)
        .bind(dto.student_id)
        .bind(dto.status)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, "Attendance already recorded for this student"))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "attendance.mark", "attendance_record", record.id).details(
                json!({
                    "class_session_id": id,
                    "student_id": dto.student_id,
                    "status": record.status,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        Ok(record)
    }

    #[instrument(skip(db))]
    pub async fn get_records(
        db: &PgPool,
        id: Uuid,
    ) -> Result<Vec<AttendanceRecordWithStudent>, AppError> {
        Self::get_class_session(db, id).await?;

        let records = sqlx::query_as::<_, AttendanceRecordWithStudent>(
            r#"SELECT ar.id, ar.class_session_id, ar.student_id, s.matric_number, s.first_name,
                      s.last_name, ar.status, ar.method, ar.marked_by, ar.marked_at
               FROM attendance_records ar
               JOIN students s ON s.id = ar.student_id
               WHERE ar.class_session_id = $1
               ORDER BY s.last_name, s.first_name, s.matric_number"#,
        )
        .bind(id)
        .fetch_all(db)
        .await?;

        Ok(records)
    }

    #[instrument(skip(db))]
    pub async fn get_student_summary(
        db: &PgPool,
        student_id: Uuid,
    ) -> Result<StudentAttendanceSummary, AppError> {
        let student = StudentService::get_student(db, student_id).await?;

        let courses = sqlx::query_as::<_, CourseAttendanceSummary>(
            r#"SELECT cs.course_code,
                      COUNT(*) AS total,
                      COUNT(*) FILTER (WHERE ar.status = 'present') AS present,
                      COUNT(*) FILTER (WHERE ar.status = 'late') AS late,
                      COUNT(*) FILTER (WHERE ar.status = 'absent') AS absent,
                      COUNT(*) FILTER (WHERE ar.status = 'excused') AS excused
               FROM attendance_records ar
               JOIN class_sessions cs ON cs.id = ar.class_session_id
               WHERE ar.student_id = $1
               GROUP BY cs.course_code
               ORDER BY cs.course_code"#,
        )
        .bind(student.id)
        .fetch_all(db)
        .await?
        .into_iter()
        .map(CourseAttendanceSummary::with_rate)
        .collect();

        Ok(StudentAttendanceSummary {
            student_id: student.id,
            matric_number: student.matric_number,
            courses,
        })
    }
}
