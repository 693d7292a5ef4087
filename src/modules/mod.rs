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
