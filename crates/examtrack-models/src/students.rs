//! Student domain models and DTOs.
//!
//! Students are not system users; they are identified by their matriculation
//! number, which is stored trimmed and uppercased.

use examtrack_core::serde::deserialize_optional_from_str;
use examtrack_core::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Canonical form of a matriculation number.
pub fn normalize_matric(matric_number: &str) -> String {
    matric_number.trim().to_uppercase()
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Student {
    pub id: Uuid,
    #[schema(example = "CSC/2021/001")]
    pub matric_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub department: String,
    #[schema(example = 300)]
    pub level: i32,
    pub programme: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 50))]
    pub matric_number: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub department: String,
    #[validate(range(min = 100, max = 900))]
    pub level: i32,
    #[validate(length(min = 1, max = 150))]
    pub programme: Option<String>,
}

/// Partial update; only provided fields change.
#[derive(Deserialize, Debug, Clone, Default, ToSchema, Validate)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 50))]
    pub matric_number: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub department: Option<String>,
    #[validate(range(min = 100, max = 900))]
    pub level: Option<i32>,
    #[validate(length(min = 1, max = 150))]
    pub programme: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentFilterParams {
    pub department: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub level: Option<i32>,
    /// Case-insensitive match on matric number or names
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedStudentsResponse {
    pub data: Vec<Student>,
    pub meta: PaginationMeta,
}
