//! Admin account bootstrap.

use examtrack_core::hash_password;
use examtrack_models::UserRole;
use sqlx::PgPool;
use uuid::Uuid;

/// Creates an active admin account. Fails if the email is taken.
pub async fn create_admin(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<Uuid, Box<dyn std::error::Error>> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".into());
    }

    let hashed_password =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let mut tx = db.begin().await?;

    let user_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (first_name, last_name, email, password, role)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email.trim().to_lowercase())
    .bind(&hashed_password)
    .bind(UserRole::Admin)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(user_id) = user_id else {
        tx.rollback().await?;
        return Err("User with this email already exists".into());
    };

    sqlx::query(
        "INSERT INTO audit_logs (actor_id, action, entity_type, entity_id, details)
         VALUES (NULL, 'user.create', 'user', $1, jsonb_build_object('source', 'cli'))",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(user_id)
}
