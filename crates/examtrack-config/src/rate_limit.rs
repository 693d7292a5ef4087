//! Rate limiting configuration.
//!
//! Login, token refresh and the public attendance check-in are limited per
//! client IP with `tower_governor` token buckets:
//!
//! - One token is added every `*_per_second` seconds
//! - Each request consumes one token
//! - At most `*_burst_size` tokens accumulate
//! - A request arriving at an empty bucket is rejected with 429
//!
//! The client IP is taken from `X-Forwarded-For`, `X-Real-Ip` or `Forwarded`,
//! then the peer address.
//!
//! # Configuration
//!
//! - `RATE_LIMIT_AUTH_PER_SECOND`: seconds per replenished auth token (default: 10)
//! - `RATE_LIMIT_AUTH_BURST_SIZE`: burst size for auth endpoints (default: 5)
//! - `RATE_LIMIT_PUBLIC_PER_SECOND`: seconds per replenished check-in token (default: 1)
//! - `RATE_LIMIT_PUBLIC_BURST_SIZE`: burst size for public check-in (default: 60)
//!
//! # Example
//!
//! ```ignore
//! use examtrack_config::RateLimitConfig;
//!
//! let config = RateLimitConfig::from_env();
//! let auth_governor = config.auth_governor_config();
//! ```

use std::sync::Arc;

use governor::middleware::NoOpMiddleware;
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::SmartIpKeyExtractor;

/// Governor settings shared by every request to a limited route group.
pub type ClientGovernorConfig = GovernorConfig<SmartIpKeyExtractor, NoOpMiddleware>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Seconds between replenished tokens for auth endpoints.
    pub auth_per_second: u64,
    /// Burst size for auth endpoints.
    ///
    /// Kept small to slow down credential stuffing.
    pub auth_burst_size: u32,
    /// Seconds between replenished tokens for the public check-in endpoint.
    pub public_per_second: u64,
    /// Burst size for the public check-in endpoint.
    ///
    /// A lecture hall full of students behind one campus NAT checks in at once.
    pub public_burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            auth_per_second: 10,
            auth_burst_size: 5,
            public_per_second: 1,
            public_burst_size: 60,
        }
    }
}

impl RateLimitConfig {
    /// Creates a new `RateLimitConfig` from environment variables, falling back
    /// to the defaults for unset or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            auth_per_second: read_env("RATE_LIMIT_AUTH_PER_SECOND", defaults.auth_per_second),
            auth_burst_size: read_env("RATE_LIMIT_AUTH_BURST_SIZE", defaults.auth_burst_size),
            public_per_second: read_env(
                "RATE_LIMIT_PUBLIC_PER_SECOND",
                defaults.public_per_second,
            ),
            public_burst_size: read_env(
                "RATE_LIMIT_PUBLIC_BURST_SIZE",
                defaults.public_burst_size,
            ),
        }
    }

    /// Governor config for login and token refresh.
    ///
    /// Returns `None` only if the builder rejects the values, which zero
    /// clamping rules out.
    #[must_use]
    pub fn auth_governor_config(&self) -> Option<Arc<ClientGovernorConfig>> {
        governor_config(self.auth_per_second, self.auth_burst_size)
    }

    /// Governor config for unauthenticated attendance check-ins.
    #[must_use]
    pub fn public_governor_config(&self) -> Option<Arc<ClientGovernorConfig>> {
        governor_config(self.public_per_second, self.public_burst_size)
    }
}

fn read_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// The builder refuses a zero period or burst.
fn governor_config(per_second: u64, burst_size: u32) -> Option<Arc<ClientGovernorConfig>> {
    GovernorConfigBuilder::default()
        .per_second(per_second.max(1))
        .burst_size(burst_size.max(1))
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .map(Arc::new)
}
