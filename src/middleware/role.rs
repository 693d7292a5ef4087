//! Role checks for handlers.
//!
//! Most routes are guarded by permission extractors from [`super::auth`].
//! Ownership rules (only the recipient may confirm a transfer, only the
//! class lecturer may close a session) need the role as well, which these
//! helpers read from the token.

use axum::{extract::FromRequestParts, http::request::Parts};
use examtrack_core::AppError;
use examtrack_models::users::UserRole;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Extractor for admin-only endpoints.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;

        if auth_user.role()? != UserRole::Admin {
            return Err(AppError::forbidden(
                "Access denied. Administrator privileges required.".to_string(),
            ));
        }

        Ok(RequireAdmin(auth_user))
    }
}

/// Passes for admins and for the user identified by `owner_id`.
pub fn check_owner_or_admin(
    auth_user: &AuthUser,
    owner_id: uuid::Uuid,
    message: &str,
) -> Result<(), AppError> {
    if auth_user.is_admin() || auth_user.user_id()? == owner_id {
        return Ok(());
    }
    Err(AppError::forbidden(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use examtrack_auth::Claims;
    use uuid::Uuid;

    fn auth_user(id: Uuid, role: UserRole) -> AuthUser {
        AuthUser(Claims {
            sub: id.to_string(),
            email: "user@example.com".to_string(),
            role: role.as_str().to_string(),
            permissions: role.permission_strings(),
            exp: 9999999999,
            iat: 1234567890,
        })
    }

    #[test]
    fn test_check_owner_or_admin() {
        let owner = Uuid::new_v4();
        let lecturer = auth_user(owner, UserRole::Lecturer);
        let other = auth_user(Uuid::new_v4(), UserRole::Lecturer);
        let admin = auth_user(Uuid::new_v4(), UserRole::Admin);

        assert!(check_owner_or_admin(&lecturer, owner, "no").is_ok());
        assert!(check_owner_or_admin(&admin, owner, "no").is_ok());

        let err = check_owner_or_admin(&other, owner, "Only the lecturer").unwrap_err();
        assert_eq!(err.status.as_u16(), 403);
        assert_eq!(err.error.to_string(), "Only the lecturer");
    }

    #[test]
    fn test_unknown_role_in_token() {
        let mut user = auth_user(Uuid::new_v4(), UserRole::Admin);
        user.0.role = "janitor".to_string();
        assert!(user.role().is_err());
        assert!(!user.is_admin());
    }
}
