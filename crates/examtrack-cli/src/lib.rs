//! # ExamTrack CLI
//!
//! Administrative commands and fake-data seeding for development databases.
//!
//! ```ignore
//! use examtrack_cli::seeder::{seed_all, SeedConfig};
//!
//! seed_all(&pool, SeedConfig::default()).await?;
//! ```

pub mod admin;
pub mod seeder;
