//! Chain-of-custody workflow for exam scripts.
//!
//! A batch moves between handlers through `request → confirm | reject |
//! cancel`. Every step runs in one transaction that locks the exam session
//! row before the transfer row, so concurrent hand-overs of the same session
//! serialize. Events are published only after commit.

use examtrack_core::{AppError, PaginationMeta};
use examtrack_models::events::kinds;
use examtrack_models::DomainEvent;
use examtrack_models::incidents::IncidentSeverity;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::events::EventBus;
use crate::metrics::{track_discrepancy, track_incident_reported, track_transfer};
use crate::modules::audit::service::{AuditEntry, AuditService};
use crate::modules::exam_sessions::model::{ExamSession, ExamSessionStatus};
use crate::modules::exam_sessions::service::ExamSessionService;
use crate::modules::incidents::service::IncidentService;
use crate::modules::users::model::UserRole;
use crate::modules::users::service::UserService;

use super::model::{
    BatchTransfer, ConfirmTransferDto, Discrepancy, PaginatedTransfersResponse,
    RejectTransferDto, ReportDiscrepancyDto, RequestTransferDto, TransferDirection,
    TransferFilterParams, TransferStatus,
};

const PENDING_EXISTS: &str = "Exam session already has a pending transfer";

fn not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Batch transfer not found"))
}

fn require_pending(transfer: &BatchTransfer) -> Result<(), AppError> {
    if transfer.status != TransferStatus::Pending {
        return Err(AppError::conflict(anyhow::anyhow!(
            "Transfer is already {}",
            transfer.status
        )));
    }
    Ok(())
}

fn require_recipient(transfer: &BatchTransfer, actor_id: Uuid) -> Result<(), AppError> {
    if transfer.to_handler_id != actor_id {
        return Err(AppError::forbidden(
            "Only the recipient can respond to this transfer".to_string(),
        ));
    }
    Ok(())
}

pub struct BatchTransferService;

impl BatchTransferService {
    #[instrument(skip(db, events))]
    pub async fn request_transfer(
        db: &PgPool,
        events: &EventBus,
        actor_id: Uuid,
        is_admin: bool,
        dto: RequestTransferDto,
    ) -> Result<BatchTransfer, AppError> {
        if dto.to_handler_id == actor_id {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot transfer scripts to yourself"
            )));
        }

        let mut tx = db.begin().await?;

        let session = ExamSessionService::find(&mut *tx, dto.exam_session_id, true)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Exam session not found")))?;

        if session.status == ExamSessionStatus::Cancelled {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Scripts of a cancelled exam session cannot be transferred"
            )));
        }

        UserService::require_active_with_role(
            &mut *tx,
            dto.to_handler_id,
            &UserRole::HANDLERS,
            "Recipient must be an active handler",
        )
        .await?;

        let holder = Self::current_holder(&mut tx, &session).await?;
        if !is_admin && holder != Some(actor_id) {
            return Err(AppError::forbidden(
                "Only the current custody holder can hand over these scripts".to_string(),
            ));
        }

        let pending = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                   SELECT 1 FROM batch_transfers
                   WHERE exam_session_id = $1 AND status = 'pending'
               )"#,
        )
        .bind(session.id)
        .fetch_one(&mut *tx)
        .await?;

        if pending {
            return Err(AppError::conflict(anyhow::anyhow!(PENDING_EXISTS)));
        }

        let transfer = sqlx::query_as::<_, BatchTransfer>(
            r#"INSERT INTO batch_transfers
                   (exam_session_id, from_handler_id, to_handler_id, script_count, notes)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, exam_session_id, from_handler_id, to_handler_id, script_count,
                         received_count, status, notes, rejection_reason, has_discrepancy,
                         discrepancy_note, requested_at, responded_at, updated_at"#,
        )
        .bind(session.id)
        .bind(actor_id)
        .bind(dto.to_handler_id)
        .bind(dto.script_count)
        .bind(&dto.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, PENDING_EXISTS))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "transfer.request", "batch_transfer", transfer.id)
                .details(json!({
                    "exam_session_id": session.id,
                    "to_handler_id": transfer.to_handler_id,
                    "script_count": transfer.script_count,
                })),
        )
        .await?;

        tx.commit().await?;

        track_transfer("requested");
        events.publish(
            Self::event(kinds::TRANSFER_REQUESTED, &transfer, &session)
                .to_recipient(transfer.to_handler_id),
        );

        Ok(transfer)
    }

    #[instrument(skip(db, events))]
    pub async fn confirm_transfer(
        db: &PgPool,
        events: &EventBus,
        actor_id: Uuid,
        id: Uuid,
        dto: ConfirmTransferDto,
    ) -> Result<BatchTransfer, AppError> {
        let mut tx = db.begin().await?;
        let (session, transfer) = Self::lock(&mut tx, id).await?;

        require_recipient(&transfer, actor_id)?;
        require_pending(&transfer)?;

        let received = dto.received_count.unwrap_or(transfer.script_count);
        let discrepancy = Discrepancy::between(transfer.script_count, received);
        let note = discrepancy
            .as_ref()
            .map(|d| dto.discrepancy_note.clone().unwrap_or_else(|| d.default_note()));

        let transfer = sqlx::query_as::<_, BatchTransfer>(
            r#"UPDATE batch_transfers SET
                   status = 'confirmed',
                   received_count = $2,
                   has_discrepancy = $3,
                   discrepancy_note = $4,
                   responded_at = NOW(),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, exam_session_id, from_handler_id, to_handler_id, script_count,
                         received_count, status, notes, rejection_reason, has_discrepancy,
                         discrepancy_note, requested_at, responded_at, updated_at"#,
        )
        .bind(id)
        .bind(received)
        .bind(discrepancy.is_some())
        .bind(&note)
        .fetch_one(&mut *tx)
        .await?;

        let incident = match (&discrepancy, &note) {
            (Some(d), Some(note)) => Some(
                IncidentService::open_for_discrepancy(
                    &mut tx,
                    actor_id,
                    &session,
                    &transfer,
                    d.severity(),
                    note,
                )
                .await?,
            ),
            _ => None,
        };

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "transfer.confirm", "batch_transfer", id).details(json!({
                "script_count": transfer.script_count,
                "received_count": received,
                "incident_id": incident.as_ref().map(|i| i.id),
            })),
        )
        .await?;

        tx.commit().await?;

        track_transfer("confirmed");
        events.publish(
            Self::event(kinds::TRANSFER_CONFIRMED, &transfer, &session)
                .to_recipient(transfer.from_handler_id),
        );
        if let Some(d) = &discrepancy {
            track_discrepancy(d.missing());
            events.publish(
                Self::event(kinds::TRANSFER_DISCREPANCY, &transfer, &session)
                    .to_recipient(transfer.from_handler_id),
            );
        }
        if let Some(incident) = &incident {
            IncidentService::announce_reported(events, incident);
        }

        Ok(transfer)
    }

    #[instrument(skip(db, events))]
    pub async fn reject_transfer(
        db: &PgPool,
        events: &EventBus,
        actor_id: Uuid,
        id: Uuid,
        dto: RejectTransferDto,
    ) -> Result<BatchTransfer, AppError> {
        let reason = dto.reason.trim();
        if reason.is_empty() {
            return Err(AppError::unprocessable(anyhow::anyhow!(
                "reason is required to reject a transfer"
            )));
        }

        let mut tx = db.begin().await?;
        let (session, transfer) = Self::lock(&mut tx, id).await?;

        require_recipient(&transfer, actor_id)?;
        require_pending(&transfer)?;

        let transfer = sqlx::query_as::<_, BatchTransfer>(
            r#"UPDATE batch_transfers SET
                   status = 'rejected',
                   rejection_reason = $2,
                   responded_at = NOW(),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, exam_session_id, from_handler_id, to_handler_id, script_count,
                         received_count, status, notes, rejection_reason, has_discrepancy,
                         discrepancy_note, requested_at, responded_at, updated_at"#,
        )
        .bind(id)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "transfer.reject", "batch_transfer", id)
                .details(json!({ "reason": transfer.rejection_reason })),
        )
        .await?;

        tx.commit().await?;

        track_transfer("rejected");
        events.publish(
            Self::event(kinds::TRANSFER_REJECTED, &transfer, &session)
                .to_recipient(transfer.from_handler_id),
        );

        Ok(transfer)
    }

    #[instrument(skip(db, events))]
    pub async fn cancel_transfer(
        db: &PgPool,
        events: &EventBus,
        actor_id: Uuid,
        is_admin: bool,
        id: Uuid,
    ) -> Result<BatchTransfer, AppError> {
        let mut tx = db.begin().await?;
        let (session, transfer) = Self::lock(&mut tx, id).await?;

        if !is_admin && transfer.from_handler_id != actor_id {
            return Err(AppError::forbidden(
                "Only the sender can cancel this transfer".to_string(),
            ));
        }
        require_pending(&transfer)?;

        let transfer = sqlx::query_as::<_, BatchTransfer>(
            r#"UPDATE batch_transfers SET
                   status = 'cancelled',
                   responded_at = NOW(),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, exam_session_id, from_handler_id, to_handler_id, script_count,
                         received_count, status, notes, rejection_reason, has_discrepancy,
                         discrepancy_note, requested_at, responded_at, updated_at"#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "transfer.cancel", "batch_transfer", id),
        )
        .await?;

        tx.commit().await?;

        track_transfer("cancelled");
        events.publish(
            Self::event(kinds::TRANSFER_CANCELLED, &transfer, &session)
                .to_recipient(transfer.to_handler_id),
        );

        Ok(transfer)
    }

    /// Flags a mismatch found after the batch was confirmed.
    #[instrument(skip(db, events))]
    pub async fn report_discrepancy(
        db: &PgPool,
        events: &EventBus,
        actor_id: Uuid,
        is_admin: bool,
        id: Uuid,
        dto: ReportDiscrepancyDto,
    ) -> Result<BatchTransfer, AppError> {
        let mut tx = db.begin().await?;
        let (session, transfer) = Self::lock(&mut tx, id).await?;

        let is_party = transfer.to_handler_id == actor_id || transfer.from_handler_id == actor_id;
        if !is_admin && !is_party {
            return Err(AppError::forbidden(
                "Only the sender or recipient can report a discrepancy".to_string(),
            ));
        }
        if transfer.status != TransferStatus::Confirmed {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Discrepancies can only be reported on confirmed transfers"
            )));
        }

        let received = dto
            .received_count
            .or(transfer.received_count)
            .unwrap_or(transfer.script_count);
        let discrepancy = Discrepancy::between(transfer.script_count, received);
        let severity = discrepancy
            .as_ref()
            .map(Discrepancy::severity)
            .unwrap_or(IncidentSeverity::Medium);
        let note = dto.note.trim().to_string();

        let transfer = sqlx::query_as::<_, BatchTransfer>(
            r#"UPDATE batch_transfers SET
                   received_count = $2,
                   has_discrepancy = TRUE,
                   discrepancy_note = $3,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, exam_session_id, from_handler_id, to_handler_id, script_count,
                         received_count, status, notes, rejection_reason, has_discrepancy,
                         discrepancy_note, requested_at, responded_at, updated_at"#,
        )
        .bind(id)
        .bind(received)
        .bind(&note)
        .fetch_one(&mut *tx)
        .await?;

        let incident = IncidentService::open_for_discrepancy(
            &mut tx, actor_id, &session, &transfer, severity, &note,
        )
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "transfer.report_discrepancy", "batch_transfer", id)
                .details(json!({
                    "received_count": received,
                    "incident_id": incident.id,
                })),
        )
        .await?;

        tx.commit().await?;

        track_discrepancy(discrepancy.as_ref().map_or(0, Discrepancy::missing));
        for party in [transfer.from_handler_id, transfer.to_handler_id] {
            if party != actor_id {
                events.publish(
                    Self::event(kinds::TRANSFER_DISCREPANCY, &transfer, &session)
                        .to_recipient(party),
                );
            }
        }
        IncidentService::announce_reported(events, &incident);

        Ok(transfer)
    }

    #[instrument(skip(db))]
    pub async fn get_transfers(
        db: &PgPool,
        actor_id: Uuid,
        filters: TransferFilterParams,
    ) -> Result<PaginatedTransfersResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let (to_handler, from_handler) = match filters.direction {
            Some(TransferDirection::Incoming) => (Some(actor_id), None),
            Some(TransferDirection::Outgoing) => (None, Some(actor_id)),
            None => (None, None),
        };

        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM batch_transfers
               WHERE ($1::transfer_status IS NULL OR status = $1)
                 AND ($2::uuid IS NULL OR exam_session_id = $2)
                 AND ($3::uuid IS NULL OR to_handler_id = $3)
                 AND ($4::uuid IS NULL OR from_handler_id = $4)
                 AND ($5::boolean IS NULL OR has_discrepancy = $5)"#,
        )
        .bind(filters.status)
        .bind(filters.exam_session_id)
        .bind(to_handler)
        .bind(from_handler)
        .bind(filters.has_discrepancy)
        .fetch_one(db)
        .await?;

        let transfers = sqlx::query_as::<_, BatchTransfer>(
            r#"SELECT id, exam_session_id, from_handler_id, to_handler_id, script_count,
                      received_count, status, notes, rejection_reason, has_discrepancy,
                      discrepancy_note, requested_at, responded_at, updated_at
               FROM batch_transfers
               WHERE ($1::transfer_status IS NULL OR status = $1)
                 AND ($2::uuid IS NULL OR exam_session_id = $2)
                 AND ($3::uuid IS NULL OR to_handler_id = $3)
                 AND ($4::uuid IS NULL OR from_handler_id = $4)
                 AND ($5::boolean IS NULL OR has_discrepancy = $5)
               ORDER BY requested_at DESC, id
               LIMIT $6 OFFSET $7"#,
        )
        .bind(filters.status)
        .bind(filters.exam_session_id)
        .bind(to_handler)
        .bind(from_handler)
        .bind(filters.has_discrepancy)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedTransfersResponse {
            data: transfers,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_transfer(db: &PgPool, id: Uuid) -> Result<BatchTransfer, AppError> {
        Self::find(&mut *db.acquire().await?, id, false)
            .await?
            .ok_or_else(not_found)
    }

    async fn find(
        conn: &mut PgConnection,
        id: Uuid,
        for_update: bool,
    ) -> Result<Option<BatchTransfer>, AppError> {
        let query = if for_update {
            r#"SELECT id, exam_session_id, from_handler_id, to_handler_id, script_count,
                      received_count, status, notes, rejection_reason, has_discrepancy,
                      discrepancy_note, requested_at, responded_at, updated_at
               FROM batch_transfers WHERE id = $1 FOR UPDATE"#
        } else {
            r#"SELECT id, exam_session_id, from_handler_id, to_handler_id, script_count,
                      received_count, status, notes, rejection_reason, has_discrepancy,
                      discrepancy_note, requested_at, responded_at, updated_at
               FROM batch_transfers WHERE id = $1"#
        };

        let transfer = sqlx::query_as::<_, BatchTransfer>(query)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(transfer)
    }

    /// Locks the transfer's session, then the transfer itself.
    async fn lock(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<(ExamSession, BatchTransfer), AppError> {
        let session_id = Self::find(&mut *conn, id, false)
            .await?
            .ok_or_else(not_found)?
            .exam_session_id;

        let session = ExamSessionService::find(&mut *conn, session_id, true)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Exam session not found")))?;

        let transfer = Self::find(&mut *conn, id, true)
            .await?
            .ok_or_else(not_found)?;

        Ok((session, transfer))
    }

    /// Recipient of the latest confirmed transfer, else the invigilator.
    pub async fn current_holder(
        conn: &mut PgConnection,
        session: &ExamSession,
    ) -> Result<Option<Uuid>, AppError> {
        let last_recipient = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT to_handler_id FROM batch_transfers
               WHERE exam_session_id = $1 AND status = 'confirmed'
               ORDER BY requested_at DESC, responded_at DESC
               LIMIT 1"#,
        )
        .bind(session.id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(last_recipient.or(session.invigilator_id))
    }

    fn event(kind: &str, transfer: &BatchTransfer, session: &ExamSession) -> DomainEvent {
        DomainEvent::new(
            kind,
            "batch_transfer",
            transfer.id,
            &json!({
                "exam_session_id": session.id,
                "course_code": session.course_code,
                "from_handler_id": transfer.from_handler_id,
                "to_handler_id": transfer.to_handler_id,
                "script_count": transfer.script_count,
                "received_count": transfer.received_count,
                "status": transfer.status,
                "has_discrepancy": transfer.has_discrepancy,
            }),
        )
    }
}
