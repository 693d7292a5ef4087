use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use examtrack_auth::{Claims, verify_token};
use examtrack_core::{AppError, permissions};
use examtrack_models::users::UserRole;
use uuid::Uuid;

use crate::state::AppState;

/// Extractor that validates the access token and exposes its claims.
///
/// Role and permissions come from the token, so guarded handlers never
/// re-read the user row.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Check if the user has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.0.permissions.iter().any(|p| p == permission)
    }

    /// Get the user ID as UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.0.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token".to_string()))
    }

    /// Role carried by the token.
    pub fn role(&self) -> Result<UserRole, AppError> {
        self.0
            .role
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid role in token".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == UserRole::Admin.as_str()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Invalid authorization header format".to_string())
        })?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Generates an extractor that authenticates the caller and requires one
/// permission, rejecting with 403 otherwise.
#[macro_export]
macro_rules! require_permission {
    ($name:ident, $permission:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = examtrack_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    $crate::middleware::auth::AuthUser::from_request_parts(parts, state).await?;

                if !auth_user.has_permission($permission) {
                    return Err(examtrack_core::AppError::forbidden(format!(
                        "Access denied. Missing required permission: {}",
                        $permission
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

// Users
require_permission!(RequireUsersCreate, permissions::USERS_CREATE);
require_permission!(RequireUsersRead, permissions::USERS_READ);
require_permission!(RequireUsersUpdate, permissions::USERS_UPDATE);
require_permission!(RequireUsersDelete, permissions::USERS_DELETE);

// Students
require_permission!(RequireStudentsCreate, permissions::STUDENTS_CREATE);
require_permission!(RequireStudentsRead, permissions::STUDENTS_READ);
require_permission!(RequireStudentsUpdate, permissions::STUDENTS_UPDATE);
require_permission!(RequireStudentsDelete, permissions::STUDENTS_DELETE);

// Exam sessions
require_permission!(RequireExamSessionsCreate, permissions::EXAM_SESSIONS_CREATE);
require_permission!(RequireExamSessionsRead, permissions::EXAM_SESSIONS_READ);
require_permission!(RequireExamSessionsUpdate, permissions::EXAM_SESSIONS_UPDATE);
require_permission!(RequireExamSessionsDelete, permissions::EXAM_SESSIONS_DELETE);

// Batch transfers
require_permission!(RequireTransfersRead, permissions::TRANSFERS_READ);
require_permission!(RequireTransfersRequest, permissions::TRANSFERS_REQUEST);
require_permission!(RequireTransfersRespond, permissions::TRANSFERS_RESPOND);

// Incidents
require_permission!(RequireIncidentsCreate, permissions::INCIDENTS_CREATE);
require_permission!(RequireIncidentsRead, permissions::INCIDENTS_READ);
require_permission!(RequireIncidentsUpdate, permissions::INCIDENTS_UPDATE);

// Attendance
require_permission!(RequireAttendanceRead, permissions::ATTENDANCE_READ);
require_permission!(RequireAttendanceManage, permissions::ATTENDANCE_MANAGE);

// Reporting
require_permission!(RequireAnalyticsView, permissions::ANALYTICS_VIEW);
require_permission!(RequireAuditRead, permissions::AUDIT_READ);
