use examtrack_core::{AppError, PaginationMeta};
use examtrack_models::DomainEvent;
use examtrack_models::events::kinds;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::events::EventBus;
use crate::metrics::track_incident_reported;
use crate::modules::audit::service::{AuditEntry, AuditService};
use crate::modules::batch_transfers::model::BatchTransfer;
use crate::modules::exam_sessions::model::ExamSession;
use crate::modules::users::model::UserRole;
use crate::modules::users::service::UserService;

use super::model::{
    AssignIncidentDto, CreateIncidentDto, Incident, IncidentFilterParams, IncidentSeverity,
    IncidentStatus, IncidentType, PaginatedIncidentsResponse, UpdateIncidentDto,
    UpdateIncidentStatusDto,
};

fn not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Incident not found"))
}

fn require_open(incident: &Incident) -> Result<(), AppError> {
    if incident.status.is_terminal() {
        return Err(AppError::conflict(anyhow::anyhow!(
            "Incident is already {}",
            incident.status
        )));
    }
    Ok(())
}

/// Checks a status change and returns the notes to store with it.
fn validate_status_change(
    current: IncidentStatus,
    dto: &UpdateIncidentStatusDto,
) -> Result<Option<String>, AppError> {
    if !current.can_transition_to(dto.status) {
        return Err(AppError::conflict(anyhow::anyhow!(
            "Cannot change incident status from {} to {}",
            current,
            dto.status
        )));
    }

    let notes = dto
        .resolution_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    if dto.status.is_terminal() && notes.is_none() {
        return Err(AppError::unprocessable(anyhow::anyhow!(
            "resolution_notes is required to {} an incident",
            if dto.status == IncidentStatus::Resolved {
                "resolve"
            } else {
                "dismiss"
            }
        )));
    }

    Ok(notes)
}

pub struct IncidentService;

impl IncidentService {
    #[instrument(skip(db, events))]
    pub async fn report_incident(
        db: &PgPool,
        events: &EventBus,
        actor_id: Uuid,
        dto: CreateIncidentDto,
    ) -> Result<Incident, AppError> {
        if !dto.has_subject() {
            return Err(AppError::unprocessable(anyhow::anyhow!(
                "An incident must reference a student, exam session or batch transfer"
            )));
        }

        let mut tx = db.begin().await?;

        let incident = sqlx::query_as::<_, Incident>(
            r#"INSERT INTO incidents
                   (incident_type, severity, title, description, student_id,
                    exam_session_id, batch_transfer_id, reported_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING id, incident_type, severity, status, title, description, student_id,
                         exam_session_id, batch_transfer_id, reported_by, assigned_to,
                         resolution_notes, resolved_at, created_at, updated_at"#,
        )
        .bind(dto.incident_type)
        .bind(dto.severity.unwrap_or(IncidentSeverity::Medium))
        .bind(dto.title.trim())
        .bind(dto.description.trim())
        .bind(dto.student_id)
        .bind(dto.exam_session_id)
        .bind(dto.batch_transfer_id)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, "Incident already exists"))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "incident.report", "incident", incident.id).details(json!({
                "incident_type": incident.incident_type,
                "severity": incident.severity,
            })),
        )
        .await?;

        tx.commit().await?;

        Self::announce_reported(events, &incident);

        Ok(incident)
    }

    /// Opens a script discrepancy incident inside the caller's transaction.
    pub async fn open_for_discrepancy(
        conn: &mut PgConnection,
        actor_id: Uuid,
        session: &ExamSession,
        transfer: &BatchTransfer,
        severity: IncidentSeverity,
        note: &str,
    ) -> Result<Incident, AppError> {
        let incident = sqlx::query_as::<_, Incident>(
            r#"INSERT INTO incidents
                   (incident_type, severity, title, description, exam_session_id,
                    batch_transfer_id, reported_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, incident_type, severity, status, title, description, student_id,
                         exam_session_id, batch_transfer_id, reported_by, assigned_to,
                         resolution_notes, resolved_at, created_at, updated_at"#,
        )
        .bind(IncidentType::ScriptDiscrepancy)
        .bind(severity)
        .bind(format!("Script discrepancy for {}", session.course_code))
        .bind(note)
        .bind(session.id)
        .bind(transfer.id)
        .bind(actor_id)
        .fetch_one(&mut *conn)
        .await?;

        AuditService::record(
            &mut *conn,
            AuditEntry::new(actor_id, "incident.report", "incident", incident.id).details(json!({
                "incident_type": incident.incident_type,
                "severity": incident.severity,
                "batch_transfer_id": transfer.id,
            })),
        )
        .await?;

        Ok(incident)
    }

    pub fn announce_reported(events: &EventBus, incident: &Incident) {
        track_incident_reported(incident.incident_type.as_str(), incident.severity.as_str());
        events.publish(Self::event(kinds::INCIDENT_REPORTED, incident));
    }

    #[instrument(skip(db))]
    pub async fn get_incidents(
        db: &PgPool,
        filters: IncidentFilterParams,
    ) -> Result<PaginatedIncidentsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM incidents
               WHERE ($1::incident_status IS NULL OR status = $1)
                 AND ($2::incident_severity IS NULL OR severity = $2)
                 AND ($3::incident_type IS NULL OR incident_type = $3)
                 AND ($4::uuid IS NULL OR student_id = $4)
                 AND ($5::uuid IS NULL OR exam_session_id = $5)
                 AND ($6::uuid IS NULL OR batch_transfer_id = $6)"#,
        )
        .bind(filters.status)
        .bind(filters.severity)
        .bind(filters.incident_type)
        .bind(filters.student_id)
        .bind(filters.exam_session_id)
        .bind(filters.batch_transfer_id)
        .fetch_one(db)
        .await?;

        let incidents = sqlx::query_as::<_, Incident>(
            r#"SELECT id, incident_type, severity, status, title, description, student_id,
                      exam_session_id, batch_transfer_id, reported_by, assigned_to,
                      resolution_notes, resolved_at, created_at, updated_at
               FROM incidents
               WHERE ($1::incident_status IS NULL OR status = $1)
                 AND ($2::incident_severity IS NULL OR severity = $2)
                 AND ($3::incident_type IS NULL OR incident_type = $3)
                 AND ($4::uuid IS NULL OR student_id = $4)
                 AND ($5::uuid IS NULL OR exam_session_id = $5)
                 AND ($6::uuid IS NULL OR batch_transfer_id = $6)
               ORDER BY created_at DESC, id
               LIMIT $7 OFFSET $8"#,
        )
        .bind(filters.status)
        .bind(filters.severity)
        .bind(filters.incident_type)
        .bind(filters.student_id)
        .bind(filters.exam_session_id)
        .bind(filters.batch_transfer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedIncidentsResponse {
            data: incidents,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_incident(db: &PgPool, id: Uuid) -> Result<Incident, AppError> {
        Self::find(&mut *db.acquire().await?, id, false)
            .await?
            .ok_or_else(not_found)
    }

    async fn find(
        conn: &mut PgConnection,
        id: Uuid,
        for_update: bool,
    ) -> Result<Option<Incident>, AppError> {
        let query = if for_update {
            r#"SELECT id, incident_type, severity, status, title, description, student_id,
                      exam_session_id, batch_transfer_id, reported_by, assigned_to,
                      resolution_notes, resolved_at, created_at, updated_at
               FROM incidents WHERE id = $1 FOR UPDATE"#
        } else {
            r#"SELECT id, incident_type, severity, status, title, description, student_id,
                      exam_session_id, batch_transfer_id, reported_by, assigned_to,
                      resolution_notes, resolved_at, created_at, updated_at
               FROM incidents WHERE id = $1"#
        };

        let incident = sqlx::query_as::<_, Incident>(query)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(incident)
    }

    #[instrument(skip(db, events))]
    pub async fn update_incident(
        db: &PgPool,
        events: &EventBus,
        actor_id: Uuid,
        id: Uuid,
        dto: UpdateIncidentDto,
    ) -> Result<Incident, AppError> {
        let mut tx = db.begin().await?;

        let current = Self::find(&mut tx, id, true).await?.ok_or_else(not_found)?;
        require_open(&current)?;

        let incident = sqlx::query_as::<_, Incident>(
            r#"UPDATE incidents SET
                   title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   severity = COALESCE($4, severity),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, incident_type, severity, status, title, description, student_id,
                         exam_session_id, batch_transfer_id, reported_by, assigned_to,
                         resolution_notes, resolved_at, created_at, updated_at"#,
        )
        .bind(id)
        .bind(dto.title.as_deref().map(str::trim))
        .bind(dto.description.as_deref().map(str::trim))
        .bind(dto.severity)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "incident.update", "incident", id)
                .details(json!({ "severity": incident.severity })),
        )
        .await?;

        tx.commit().await?;

        events.publish(Self::event(kinds::INCIDENT_UPDATED, &incident));

        Ok(incident)
    }

    /// Assigns an investigator. An open incident moves to investigation.
    #[instrument(skip(db, events))]
    pub async fn assign_incident(
        db: &PgPool,
        events: &EventBus,
        actor_id: Uuid,
        id: Uuid,
        dto: AssignIncidentDto,
    ) -> Result<Incident, AppError> {
        let mut tx = db.begin().await?;

        let current = Self::find(&mut tx, id, true).await?.ok_or_else(not_found)?;
        require_open(&current)?;

        let assignee = UserService::require_active_with_role(
            &mut *tx,
            dto.assigned_to,
            &UserRole::ALL,
            "Assignee must be an active user",
        )
        .await?;

        let incident = sqlx::query_as::<_, Incident>(
            r#"UPDATE incidents SET
                   assigned_to = $2,
                   status = CASE WHEN status = 'open' THEN 'under_investigation'::incident_status
                                 ELSE status END,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, incident_type, severity, status, title, description, student_id,
                         exam_session_id, batch_transfer_id, reported_by, assigned_to,
                         resolution_notes, resolved_at, created_at, updated_at"#,
        )
        .bind(id)
        .bind(dto.assigned_to)
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "incident.assign", "incident", id).details(json!({
                "assigned_to": dto.assigned_to,
                "assignee": assignee.full_name(),
                "status": incident.status,
            })),
        )
        .await?;

        tx.commit().await?;

        events.publish(
            Self::event(kinds::INCIDENT_UPDATED, &incident).to_recipient(dto.assigned_to),
        );

        Ok(incident)
    }

    #[instrument(skip(db, events))]
    pub async fn update_status(
        db: &PgPool,
        events: &EventBus,
        actor_id: Uuid,
        id: Uuid,
        dto: UpdateIncidentStatusDto,
    ) -> Result<Incident, AppError> {
        let mut tx = db.begin().await?;

        let current = Self::find(&mut tx, id, true).await?.ok_or_else(not_found)?;
        let notes = validate_status_change(current.status, &dto)?;

        let incident = sqlx::query_as::<_, Incident>(
            r#"UPDATE incidents SET
                   status = $2,
                   resolution_notes = COALESCE($3, resolution_notes),
                   resolved_at = CASE WHEN $4 THEN NOW() ELSE resolved_at END,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, incident_type, severity, status, title, description, student_id,
                         exam_session_id, batch_transfer_id, reported_by, assigned_to,
                         resolution_notes, resolved_at, created_at, updated_at"#,
        )
        .bind(id)
        .bind(dto.status)
        .bind(&notes)
        .bind(dto.status.is_terminal())
        .fetch_one(&mut *tx)
        .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "incident.status", "incident", id)
                .details(json!({ "from": current.status, "to": incident.status })),
        )
        .await?;

        tx.commit().await?;

        events.publish(Self::event(kinds::INCIDENT_UPDATED, &incident));

        Ok(incident)
    }

    #[instrument(skip(db))]
    pub async fn delete_incident(db: &PgPool, actor_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let result = sqlx::query("DELETE FROM incidents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "incident.delete", "incident", id),
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }

    fn event(kind: &str, incident: &Incident) -> DomainEvent {
        DomainEvent::new(
            kind,
            "incident",
            incident.id,
            &json!({
                "incident_type": incident.incident_type,
                "severity": incident.severity,
                "status": incident.status,
                "title": incident.title,
                "exam_session_id": incident.exam_session_id,
                "batch_transfer_id": incident.batch_transfer_id,
                "assigned_to": incident.assigned_to,
            }),
        )
    }
}
