//! Token signing settings.
//!
//! - `JWT_SECRET`: HMAC secret shared by access, refresh and attendance tokens
//! - `JWT_ACCESS_EXPIRY`: access token lifetime in seconds (default: 3600)
//! - `JWT_REFRESH_EXPIRY`: refresh token lifetime in seconds (default: 604800)

use std::env;

const DEV_SECRET: &str = "examtrack-dev-secret-change-me";
const DEFAULT_ACCESS_EXPIRY: i64 = 60 * 60;
const DEFAULT_REFRESH_EXPIRY: i64 = 7 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    /// Seconds an access token stays valid.
    pub access_token_expiry: i64,
    /// Seconds a refresh token stays valid.
    pub refresh_token_expiry: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEV_SECRET.to_string(),
            access_token_expiry: DEFAULT_ACCESS_EXPIRY,
            refresh_token_expiry: DEFAULT_REFRESH_EXPIRY,
        }
    }
}

impl JwtConfig {
    /// Reads the signing settings. An unset or empty `JWT_SECRET` falls back
    /// to the development secret.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            secret: env::var("JWT_SECRET")
                .ok()
                .filter(|secret| !secret.is_empty())
                .unwrap_or(defaults.secret),
            access_token_expiry: positive_seconds("JWT_ACCESS_EXPIRY")
                .unwrap_or(defaults.access_token_expiry),
            refresh_token_expiry: positive_seconds("JWT_REFRESH_EXPIRY")
                .unwrap_or(defaults.refresh_token_expiry),
        }
    }
}

fn positive_seconds(key: &str) -> Option<i64> {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|seconds: &i64| *seconds > 0)
}
