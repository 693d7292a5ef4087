//! # ExamTrack Config
//!
//! Configuration structures loaded from environment variables. Each type has a
//! `from_env()` constructor that falls back to development defaults.
//!
//! - [`attendance`]: QR registration token lifetime and late threshold
//! - [`cors`]: allowed browser origins
//! - [`jwt`]: token signing secret and lifetimes
//! - [`rate_limit`]: per-client `tower_governor` limits for auth and check-in
//! - [`server`]: listener addresses
//!
//! # Example
//!
//! ```ignore
//! use examtrack_config::{JwtConfig, CorsConfig, RateLimitConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let rate_limit_config = RateLimitConfig::from_env();
//! ```

pub mod attendance;
pub mod cors;
pub mod jwt;
pub mod rate_limit;
pub mod server;

pub use attendance::AttendanceConfig;
pub use cors::CorsConfig;
pub use jwt::JwtConfig;
pub use rate_limit::{ClientGovernorConfig, RateLimitConfig};
pub use server::ServerConfig;
