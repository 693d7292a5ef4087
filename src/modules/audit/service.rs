use examtrack_core::{AppError, PaginationMeta};
use serde_json::Value;
use sqlx::{Executor, PgPool, Postgres};
use tracing::instrument;
use uuid::Uuid;

use super::model::{AuditLog, AuditLogFilterParams, PaginatedAuditLogsResponse};

/// One audit row about to be written.
#[derive(Debug)]
pub struct AuditEntry<'a> {
    pub actor_id: Option<Uuid>,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: Option<Uuid>,
    pub details: Value,
}

impl<'a> AuditEntry<'a> {
    pub fn new(actor_id: Uuid, action: &'a str, entity_type: &'a str, entity_id: Uuid) -> Self {
        Self {
            actor_id: Some(actor_id),
            action,
            entity_type,
            entity_id: Some(entity_id),
            details: Value::Object(Default::default()),
        }
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

pub struct AuditService;

impl AuditService {
    /// Writes `entry` through `executor`.
    ///
    /// Pass the open transaction of the change being described so the audit
    /// row commits or rolls back with it.
    pub async fn record<'e, E>(executor: E, entry: AuditEntry<'_>) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"INSERT INTO audit_logs (actor_id, action, entity_type, entity_id, details)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(entry.actor_id)
        .bind(entry.action)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.details)
        .execute(executor)
        .await?;

        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn get_audit_logs(
        db: &PgPool,
        filters: AuditLogFilterParams,
    ) -> Result<PaginatedAuditLogsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM audit_logs
               WHERE ($1::uuid IS NULL OR actor_id = $1)
                 AND ($2::text IS NULL OR entity_type = $2)
                 AND ($3::uuid IS NULL OR entity_id = $3)
                 AND ($4::text IS NULL OR action = $4)"#,
        )
        .bind(filters.actor_id)
        .bind(&filters.entity_type)
        .bind(filters.entity_id)
        .bind(&filters.action)
        .fetch_one(db)
        .await?;

        let logs = sqlx::query_as::<_, AuditLog>(
            r#"SELECT id, actor_id, action, entity_type, entity_id, details, created_at
               FROM audit_logs
               WHERE ($1::uuid IS NULL OR actor_id = $1)
                 AND ($2::text IS NULL OR entity_type = $2)
                 AND ($3::uuid IS NULL OR entity_id = $3)
                 AND ($4::text IS NULL OR action = $4)
               ORDER BY created_at DESC, id
               LIMIT $5 OFFSET $6"#,
        )
        .bind(filters.actor_id)
        .bind(&filters.entity_type)
        .bind(filters.entity_id)
        .bind(&filters.action)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedAuditLogsResponse {
            data: logs,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }
}
