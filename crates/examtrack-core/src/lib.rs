//! # ExamTrack Core
//!
//! Foundational types shared by every ExamTrack crate:
//!
//! - [`errors`]: [`AppError`], the error type every handler returns
//! - [`pagination`]: query params and response metadata for list endpoints
//! - [`password`]: bcrypt hashing and verification
//! - [`permissions`]: permission string constants embedded in access tokens
//! - [`serde`]: query-string deserialization helpers
//!
//! # Example
//!
//! ```ignore
//! use examtrack_core::{AppError, PaginationParams, hash_password};
//!
//! let error = AppError::not_found(anyhow::anyhow!("Exam session not found"));
//! let hash = hash_password("secure_password")?;
//! let limit = PaginationParams::default().limit();
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod permissions;
pub mod serde;

pub use errors::{AppError, ErrorResponse};
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
