use examtrack_core::{AppError, PaginationMeta};
use serde_json::json;
use sqlx::{Executor, PgPool, Postgres};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit::service::{AuditEntry, AuditService};
use crate::modules::batch_transfers::model::BatchTransfer;
use crate::modules::users::model::UserRole;
use crate::modules::users::service::UserService;

use super::model::{
    AssignInvigilatorDto, CreateExamSessionDto, CustodyChain, ExamSession,
    ExamSessionFilterParams, ExamSessionStatus, PaginatedExamSessionsResponse,
    UpdateExamSessionDto,
};

const INVIGILATOR_REQUIRED: &str = "Invigilator must be an active user with the invigilator role";

fn not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Exam session not found"))
}

pub struct ExamSessionService;

impl ExamSessionService {
    #[instrument(skip(db))]
    pub async fn create_exam_session(
        db: &PgPool,
        actor_id: Uuid,
        dto: CreateExamSessionDto,
    ) -> Result<ExamSession, AppError> {
        let mut tx = db.begin().await?;

        if let Some(invigilator_id) = dto.invigilator_id {
            UserService::require_active_with_role(
                &mut *tx,
                invigilator_id,
                &[UserRole::Invigilator],
                INVIGILATOR_REQUIRED,
            )
            .await?;
        }

        let session = sqlx::query_as::<_, ExamSession>(
            r#"INSERT INTO exam_sessions
                   (course_code, course_title, department, venue, starts_at,
                    duration_minutes, expected_scripts, invigilator_id, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id, course_code, course_title, department, venue, starts_at,
                         duration_minutes, expected_scripts, status, invigilator_id,
                         created_by, created_at, updated_at"#,
        )
        .bind(dto.course_code.trim().to_uppercase())
        .bind(dto.course_title.trim())
        .bind(dto.department.trim())
        .bind(dto.venue.trim())
        .bind(dto.starts_at)
        .bind(dto.duration_minutes)
        .bind(dto.expected_scripts)
        .bind(dto.invigilator_id)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, "Exam session already exists"))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "exam_session.create", "exam_session", session.id)
                .details(json!({
                    "course_code": session.course_code,
                    "starts_at": session.starts_at,
                })),
        )
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    #[instrument(skip(db))]
    pub async fn get_exam_sessions(
        db: &PgPool,
        filters: ExamSessionFilterParams,
    ) -> Result<PaginatedExamSessionsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let course_code = filters
            .course_code
            .as_deref()
            .map(|c| c.trim().to_uppercase());

        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM exam_sessions
               WHERE ($1::exam_session_status IS NULL OR status = $1)
                 AND ($2::text IS NULL OR department = $2)
                 AND ($3::text IS NULL OR course_code = $3)
                 AND ($4::timestamptz IS NULL OR starts_at >= $4)
                 AND ($5::timestamptz IS NULL OR starts_at < $5)
                 AND ($6::uuid IS NULL OR invigilator_id = $6)"#,
        )
        .bind(filters.status)
        .bind(&filters.department)
        .bind(&course_code)
        .bind(filters.from)
        .bind(filters.to)
        .bind(filters.invigilator_id)
        .fetch_one(db)
        .await?;

        let sessions = sqlx::query_as::<_, ExamSession>(
            r#"SELECT id, course_code, course_title, department, venue, starts_at,
                      duration_minutes, expected_scripts, status, invigilator_id,
                      created_by, created_at, updated_at
               FROM exam_sessions
               WHERE ($1::exam_session_status IS NULL OR status = $1)
                 AND ($2::text IS NULL OR department = $2)
                 AND ($3::text IS NULL OR course_code = $3)
                 AND ($4::timestamptz IS NULL OR starts_at >= $4)
                 AND ($5::timestamptz IS NULL OR starts_at < $5)
                 AND ($6::uuid IS NULL OR invigilator_id = $6)
               ORDER BY starts_at, course_code
               LIMIT $7 OFFSET $8"#,
        )
        .bind(filters.status)
        .bind(&filters.department)
        .bind(&course_code)
        .bind(filters.from)
        .bind(filters.to)
        .bind(filters.invigilator_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedExamSessionsResponse {
            data: sessions,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_exam_session(db: &PgPool, id: Uuid) -> Result<ExamSession, AppError> {
        Self::find(db, id, false).await?.ok_or_else(not_found)
    }

    /// Fetches a session, taking a row lock when `for_update` is set.
    pub async fn find<'e, E>(
        executor: E,
        id: Uuid,
        for_update: bool,
    ) -> Result<Option<ExamSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = if for_update {
            r#"SELECT id, course_code, course_title, department, venue, starts_at,
                      duration_minutes, expected_scripts, status, invigilator_id,
                      created_by, created_at, updated_at
               FROM exam_sessions WHERE id = $1 FOR UPDATE"#
        } else {
            r#"SELECT id, course_code, course_title, department, venue, starts_at,
                      duration_minutes, expected_scripts, status, invigilator_id,
                      created_by, created_at, updated_at
               FROM exam_sessions WHERE id = $1"#
        };

        let session = sqlx::query_as::<_, ExamSession>(query)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(session)
    }

    #[instrument(skip(db))]
    pub async fn update_exam_session(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        dto: UpdateExamSessionDto,
    ) -> Result<ExamSession, AppError> {
        let mut tx = db.begin().await?;

        let current = Self::find(&mut *tx, id, true).await?.ok_or_else(not_found)?;
        if current.status != ExamSessionStatus::Scheduled {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Only scheduled exam sessions can be edited (current status: {})",
                current.status
            )));
        }

        let session = sqlx::query_as::<_, ExamSession>(
            r#"UPDATE exam_sessions SET
                   course_code = COALESCE($2, course_code),
                   course_title = COALESCE($3, course_title),
                   department = COALESCE($4, department),
                   venue = COALESCE($5, venue),
                   starts_at = COALESCE($6, starts_at),
                   duration_minutes = COALESCE($7, duration_minutes),
                   expected_scripts = COALESCE($8, expected_scripts),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, course_code, course_title, department, venue, starts_at,
                         duration_minutes, expected_scripts, status, invigilator_id,
                         created_by, created_at, updated_at"#,
        )
        .bind(id)
        .bind(dto.course_code.as_deref().map(|c| c.trim().to_uppercase()))
        .bind(dto.course_title.as_deref().map(str::trim))
        .bind(dto.department.as_deref().map(str::trim))
        .bind(dto.venue.as_deref().map(str::trim))
        .bind(dto.starts_at)
        .bind(dto.duration_minutes)
        .bind(dto.expected_scripts)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "exam_session.update", "exam_session", id),
        )
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    #[instrument(skip(db))]
    pub async fn delete_exam_session(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let session = Self::find(&mut *tx, id, true).await?.ok_or_else(not_found)?;

        let transfers = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM batch_transfers WHERE exam_session_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if transfers > 0 {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Exam session has batch transfers and cannot be deleted"
            )));
        }

        sqlx::query("DELETE FROM exam_sessions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::from_delete(
                    e,
                    "Exam session is linked to incidents and cannot be deleted",
                )
            })?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "exam_session.delete", "exam_session", id)
                .details(json!({ "course_code": session.course_code })),
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn update_status(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        status: ExamSessionStatus,
    ) -> Result<ExamSession, AppError> {
        let mut tx = db.begin().await?;

        let current = Self::find(&mut *tx, id, true).await?.ok_or_else(not_found)?;
        if !current.status.can_transition_to(status) {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Cannot change exam session status from {} to {}",
                current.status,
                status
            )));
        }

        let session = sqlx::query_as::<_, ExamSession>(
            r#"UPDATE exam_sessions SET status = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING id, course_code, course_title, department, venue, starts_at,
                         duration_minutes, expected_scripts, status, invigilator_id,
                         created_by, created_at, updated_at"#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "exam_session.status", "exam_session", id)
                .details(json!({ "from": current.status, "to": status })),
        )
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    #[instrument(skip(db))]
    pub async fn assign_invigilator(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        dto: AssignInvigilatorDto,
    ) -> Result<ExamSession, AppError> {
        let mut tx = db.begin().await?;

        let current = Self::find(&mut *tx, id, true).await?.ok_or_else(not_found)?;
        if current.status.is_terminal() {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Cannot assign an invigilator to a {} exam session",
                current.status
            )));
        }

        UserService::require_active_with_role(
            &mut *tx,
            dto.invigilator_id,
            &[UserRole::Invigilator],
            INVIGILATOR_REQUIRED,
        )
        .await?;

        let session = sqlx::query_as::<_, ExamSession>(
            r#"UPDATE exam_sessions SET invigilator_id = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING id, course_code, course_title, department, venue, starts_at,
                         duration_minutes, expected_scripts, status, invigilator_id,
                         created_by, created_at, updated_at"#,
        )
        .bind(id)
        .bind(dto.invigilator_id)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "exam_session.assign_invigilator", "exam_session", id)
                .details(json!({
                    "previous": current.invigilator_id,
                    "invigilator_id": dto.invigilator_id,
                })),
        )
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    #[instrument(skip(db))]
    pub async fn get_custody_chain(db: &PgPool, id: Uuid) -> Result<CustodyChain, AppError> {
        let session = Self::get_exam_session(db, id).await?;

        let transfers = sqlx::query_as::<_, BatchTransfer>(
            r#"SELECT id, exam_session_id, from_handler_id, to_handler_id, script_count,
                      received_count, status, notes, rejection_reason, has_discrepancy,
                      discrepancy_note, requested_at, responded_at, updated_at
               FROM batch_transfers
               WHERE exam_session_id = $1
               ORDER BY requested_at, id"#,
        )
        .bind(id)
        .fetch_all(db)
        .await?;

        Ok(CustodyChain::new(&session, transfers))
    }
}
