use examtrack_core::{AppError, PaginationMeta, hash_password};
use serde_json::json;
use sqlx::{Executor, PgPool, Postgres};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit::service::{AuditEntry, AuditService};

use super::model::{
    CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserFilterParams, UserRole,
};

const DUPLICATE_USER: &str = "A user with this email or staff number already exists";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserService;

impl UserService {
    #[instrument(skip(db, dto), fields(email = %dto.email, role = %dto.role))]
    pub async fn create_user(
        db: &PgPool,
        actor_id: Uuid,
        dto: CreateUserDto,
    ) -> Result<User, AppError> {
        let hashed_password = hash_password(&dto.password)?;
        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (first_name, last_name, email, password, role, department, staff_number)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, first_name, last_name, email, role, department, staff_number,
                         is_active, created_at, updated_at"#,
        )
        .bind(dto.first_name.trim())
        .bind(dto.last_name.trim())
        .bind(normalize_email(&dto.email))
        .bind(&hashed_password)
        .bind(dto.role)
        .bind(&dto.department)
        .bind(&dto.staff_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, DUPLICATE_USER))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "user.create", "user", user.id)
                .details(json!({ "email": user.email, "role": user.role })),
        )
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    #[instrument(skip(db))]
    pub async fn get_users(
        db: &PgPool,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let search = filters
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM users
               WHERE ($1::user_role IS NULL OR role = $1)
                 AND ($2::text IS NULL OR department = $2)
                 AND ($3::boolean IS NULL OR is_active = $3)
                 AND ($4::text IS NULL OR first_name ILIKE $4 OR last_name ILIKE $4 OR email ILIKE $4)"#,
        )
        .bind(filters.role)
        .bind(&filters.department)
        .bind(filters.is_active)
        .bind(&search)
        .fetch_one(db)
        .await?;

        let users = sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, email, role, department, staff_number,
                      is_active, created_at, updated_at
               FROM users
               WHERE ($1::user_role IS NULL OR role = $1)
                 AND ($2::text IS NULL OR department = $2)
                 AND ($3::boolean IS NULL OR is_active = $3)
                 AND ($4::text IS NULL OR first_name ILIKE $4 OR last_name ILIKE $4 OR email ILIKE $4)
               ORDER BY last_name, first_name, id
               LIMIT $5 OFFSET $6"#,
        )
        .bind(filters.role)
        .bind(&filters.department)
        .bind(filters.is_active)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedUsersResponse {
            data: users,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_user(db: &PgPool, id: Uuid) -> Result<User, AppError> {
        Self::find_user(db, id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    /// Looks a user up through any executor, including an open transaction.
    pub async fn find_user<'e, E>(executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, email, role, department, staff_number,
                      is_active, created_at, updated_at
               FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Active users that can hold custody of exam scripts.
    #[instrument(skip(db))]
    pub async fn get_handlers(db: &PgPool) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, email, role, department, staff_number,
                      is_active, created_at, updated_at
               FROM users
               WHERE is_active AND role <> 'admin'
               ORDER BY role, last_name, first_name"#,
        )
        .fetch_all(db)
        .await?;

        Ok(users)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_user(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        let hashed_password = dto.password.as_deref().map(hash_password).transpose()?;
        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"UPDATE users SET
                   first_name = COALESCE($2, first_name),
                   last_name = COALESCE($3, last_name),
                   email = COALESCE($4, email),
                   password = COALESCE($5, password),
                   role = COALESCE($6, role),
                   department = COALESCE($7, department),
                   staff_number = COALESCE($8, staff_number),
                   is_active = COALESCE($9, is_active),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, first_name, last_name, email, role, department, staff_number,
                         is_active, created_at, updated_at"#,
        )
        .bind(id)
        .bind(dto.first_name.as_deref().map(str::trim))
        .bind(dto.last_name.as_deref().map(str::trim))
        .bind(dto.email.as_deref().map(normalize_email))
        .bind(&hashed_password)
        .bind(dto.role)
        .bind(&dto.department)
        .bind(&dto.staff_number)
        .bind(dto.is_active)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, DUPLICATE_USER))?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, "user.update", "user", user.id).details(json!({
                "role": user.role,
                "is_active": user.is_active,
                "password_changed": hashed_password.is_some(),
            })),
        )
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    #[instrument(skip(db))]
    pub async fn delete_user(db: &PgPool, actor_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if actor_id == id {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "You cannot delete your own account"
            )));
        }

        let mut tx = db.begin().await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::from_delete(
                    e,
                    "User has custody or class records; deactivate the account instead",
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("User not found")));
        }

        AuditService::record(&mut *tx, AuditEntry::new(actor_id, "user.delete", "user", id))
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Returns the user if it is active and has one of `roles`, otherwise a
    /// 400 with `message`.
    pub async fn require_active_with_role<'e, E>(
        executor: E,
        id: Uuid,
        roles: &[UserRole],
        message: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        match Self::find_user(executor, id).await? {
            Some(user) if user.is_active && roles.contains(&user.role) => Ok(user),
            _ => Err(AppError::bad_request(anyhow::anyhow!(message.to_string()))),
        }
    }
}
