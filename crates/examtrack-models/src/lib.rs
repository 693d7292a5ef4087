//! # ExamTrack Models
//!
//! Database entities, request/response DTOs and the small pieces of domain
//! logic that only depend on them (status transitions, role permissions,
//! discrepancy and lateness rules).

pub mod analytics;
pub mod attendance;
pub mod audit;
pub mod auth;
pub mod batch_transfers;
pub mod events;
pub mod exam_sessions;
pub mod incidents;
pub mod students;
pub mod users;

pub use auth::{LoginRequest, LoginResponse, MessageResponse, RefreshTokenRequest};
pub use events::DomainEvent;
pub use users::{User, UserRole};
