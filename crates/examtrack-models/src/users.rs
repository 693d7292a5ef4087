//! User domain models and DTOs.
//!
//! Staff accounts carry exactly one [`UserRole`]. The role decides the
//! permissions embedded in the access token and whether the user can hold
//! custody of exam scripts.

use examtrack_core::permissions as perm;
use examtrack_core::serde::deserialize_optional_from_str;
use examtrack_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    DepartmentHead,
    FacultyOfficer,
    Lecturer,
    Invigilator,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::Admin,
        UserRole::DepartmentHead,
        UserRole::FacultyOfficer,
        UserRole::Lecturer,
        UserRole::Invigilator,
    ];

    /// Roles that can hold custody of exam scripts.
    pub const HANDLERS: [UserRole; 4] = [
        UserRole::DepartmentHead,
        UserRole::FacultyOfficer,
        UserRole::Lecturer,
        UserRole::Invigilator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::DepartmentHead => "department_head",
            UserRole::FacultyOfficer => "faculty_officer",
            UserRole::Lecturer => "lecturer",
            UserRole::Invigilator => "invigilator",
        }
    }

    pub fn is_handler(&self) -> bool {
        !matches!(self, UserRole::Admin)
    }

    /// Permissions granted to the role.
    pub fn permissions(&self) -> Vec<&'static str> {
        const TRANSFERS: [&str; 3] = [
            perm::TRANSFERS_READ,
            perm::TRANSFERS_REQUEST,
            perm::TRANSFERS_RESPOND,
        ];

        match self {
            UserRole::Admin => perm::ALL.to_vec(),
            UserRole::DepartmentHead => {
                let mut p = vec![
                    perm::USERS_READ,
                    perm::STUDENTS_CREATE,
                    perm::STUDENTS_READ,
                    perm::STUDENTS_UPDATE,
                    perm::STUDENTS_DELETE,
                    perm::EXAM_SESSIONS_CREATE,
                    perm::EXAM_SESSIONS_READ,
                    perm::EXAM_SESSIONS_UPDATE,
                    perm::EXAM_SESSIONS_DELETE,
                    perm::INCIDENTS_CREATE,
                    perm::INCIDENTS_READ,
                    perm::INCIDENTS_UPDATE,
                    perm::ATTENDANCE_READ,
                    perm::ATTENDANCE_MANAGE,
                    perm::ANALYTICS_VIEW,
                    perm::AUDIT_READ,
                ];
                p.extend(TRANSFERS);
                p
            }
            UserRole::FacultyOfficer => {
                let mut p = vec![
                    perm::USERS_READ,
                    perm::STUDENTS_CREATE,
                    perm::STUDENTS_READ,
                    perm::STUDENTS_UPDATE,
                    perm::EXAM_SESSIONS_CREATE,
                    perm::EXAM_SESSIONS_READ,
                    perm::EXAM_SESSIONS_UPDATE,
                    perm::INCIDENTS_CREATE,
                    perm::INCIDENTS_READ,
                    perm::INCIDENTS_UPDATE,
                    perm::ATTENDANCE_READ,
                    perm::ANALYTICS_VIEW,
                ];
                p.extend(TRANSFERS);
                p
            }
            UserRole::Lecturer => {
                let mut p = vec![
                    perm::USERS_READ,
                    perm::STUDENTS_READ,
                    perm::EXAM_SESSIONS_READ,
                    perm::INCIDENTS_CREATE,
                    perm::INCIDENTS_READ,
                    perm::ATTENDANCE_READ,
                    perm::ATTENDANCE_MANAGE,
                ];
                p.extend(TRANSFERS);
                p
            }
            UserRole::Invigilator => {
                let mut p = vec![
                    perm::USERS_READ,
                    perm::STUDENTS_READ,
                    perm::EXAM_SESSIONS_READ,
                    perm::INCIDENTS_CREATE,
                    perm::INCIDENTS_READ,
                ];
                p.extend(TRANSFERS);
                p
            }
        }
    }

    pub fn permission_strings(&self) -> Vec<String> {
        self.permissions().into_iter().map(String::from).collect()
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// A staff account. The password hash is never serialized.
#[derive(Serialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    pub department: Option<String>,
    pub staff_number: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// User row including the password hash, for credential checks only.
#[derive(FromRow, Debug, Clone)]
pub struct UserWithPassword {
    #[sqlx(flatten)]
    pub user: User,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    #[schema(example = "j.okafor@uni.edu")]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: UserRole,
    #[validate(length(min = 1, max = 150))]
    pub department: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub staff_number: Option<String>,
}

/// Partial update; only provided fields change.
#[derive(Deserialize, Debug, Clone, Default, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    pub role: Option<UserRole>,
    #[validate(length(min = 1, max = 150))]
    pub department: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub staff_number: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordDto {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8))]
    #[schema(example = "newPassword123")]
    pub new_password: String,
}

/// Query parameters for filtering users. All filters combine with AND.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilterParams {
    pub role: Option<UserRole>,
    pub department: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub is_active: Option<bool>,
    /// Case-insensitive match on first name, last name or email
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub data: Vec<User>,
    pub meta: PaginationMeta,
}
