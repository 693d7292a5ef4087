//! Class attendance settings.

use std::env;

/// Grace periods above a day are capped to it.
pub const MAX_LATE_GRACE_MINUTES: i64 = 24 * 60;
/// Registration tokens never outlive a day.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttendanceConfig {
    /// Lifetime in seconds of the registration token shown as a QR code.
    pub token_ttl_seconds: i64,
    /// Check-ins later than this many minutes after the class start are `late`.
    pub late_grace_minutes: i64,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            token_ttl_seconds: 300,
            late_grace_minutes: 15,
        }
    }
}

impl AttendanceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            token_ttl_seconds: env::var("ATTENDANCE_TOKEN_TTL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|ttl: &i64| *ttl > 0)
                .map(|ttl| ttl.min(MAX_TOKEN_TTL_SECONDS))
                .unwrap_or(defaults.token_ttl_seconds),
            late_grace_minutes: parse_grace_minutes(
                env::var("ATTENDANCE_LATE_GRACE_MINUTES").ok().as_deref(),
            )
            .unwrap_or(defaults.late_grace_minutes),
        }
    }
}

fn parse_grace_minutes(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.parse().ok())
        .filter(|minutes: &i64| *minutes >= 0)
        .map(|minutes| minutes.min(MAX_LATE_GRACE_MINUTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AttendanceConfig::default();
        assert_eq!(config.token_ttl_seconds, 300);
        assert_eq!(config.late_grace_minutes, 15);
    }

    #[test]
    fn test_grace_minutes_parsing() {
        assert_eq!(parse_grace_minutes(Some("10")), Some(10));
        assert_eq!(parse_grace_minutes(Some("-5")), None);
        assert_eq!(parse_grace_minutes(Some("soon")), None);
        assert_eq!(parse_grace_minutes(None), None);
        assert_eq!(
            parse_grace_minutes(Some("99999999999999")),
            Some(MAX_LATE_GRACE_MINUTES)
        );
    }
}
