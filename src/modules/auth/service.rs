use examtrack_auth::{create_access_token, create_refresh_token, verify_refresh_token};
use examtrack_config::JwtConfig;
use examtrack_core::{AppError, hash_password, verify_password};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::metrics::{track_jwt_issued, track_user_login_failure, track_user_login_success};
use crate::modules::audit::service::{AuditEntry, AuditService};
use crate::modules::users::model::{ChangePasswordDto, User, UserWithPassword};
use crate::modules::users::service::{UserService, normalize_email};

use super::model::{LoginRequest, LoginResponse};

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, dto, jwt_config), fields(email = %dto.email))]
    pub async fn login_user(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let invalid = || AppError::unauthorized("Invalid email or password".to_string());

        let record = sqlx::query_as::<_, UserWithPassword>(
            r#"SELECT id, first_name, last_name, email, role, department, staff_number,
                      is_active, created_at, updated_at, password
               FROM users WHERE email = $1"#,
        )
        .bind(normalize_email(&dto.email))
        .fetch_optional(db)
        .await?;

        let Some(UserWithPassword { user, password }) = record else {
            track_user_login_failure("unknown_email");
            return Err(invalid());
        };

        if !verify_password(&dto.password, &password)? {
            track_user_login_failure("wrong_password");
            return Err(invalid());
        }

        if !user.is_active {
            track_user_login_failure("inactive");
            return Err(AppError::forbidden("Account is deactivated".to_string()));
        }

        track_user_login_success(user.role.as_str());
        Self::issue_tokens(user, jwt_config)
    }

    /// Exchanges a refresh token for a fresh token pair.
    ///
    /// Role and permissions are re-read so a role change takes effect on the
    /// next refresh.
    #[instrument(skip_all)]
    pub async fn refresh_tokens(
        db: &PgPool,
        refresh_token: &str,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let claims = verify_refresh_token(refresh_token, jwt_config)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::unauthorized("Invalid or expired refresh token".to_string()))?;

        let user = UserService::find_user(db, user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::unauthorized("User no longer has access".to_string()))?;

        Self::issue_tokens(user, jwt_config)
    }

    fn issue_tokens(user: User, jwt_config: &JwtConfig) -> Result<LoginResponse, AppError> {
        let access_token = create_access_token(
            user.id,
            &user.email,
            user.role.as_str(),
            user.role.permission_strings(),
            jwt_config,
        )?;
        let refresh_token = create_refresh_token(user.id, &user.email, jwt_config)?;
        track_jwt_issued();

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
            user,
        })
    }

    #[instrument(skip(db, dto))]
    pub async fn change_password(
        db: &PgPool,
        user_id: Uuid,
        dto: ChangePasswordDto,
    ) -> Result<(), AppError> {
        let current_hash =
            sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

        if !verify_password(&dto.current_password, &current_hash)? {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Current password is incorrect"
            )));
        }

        let new_hash = hash_password(&dto.new_password)?;
        let mut tx = db.begin().await?;

        sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(&new_hash)
            .execute(&mut *tx)
            .await?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(user_id, "user.change_password", "user", user_id),
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
