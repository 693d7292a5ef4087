//! JWT claim structures.
//!
//! - [`Claims`]: access token claims carrying the user's role and permissions
//! - [`RefreshTokenClaims`]: refresh token claims for token renewal
//! - [`AttendanceTokenClaims`]: claims behind a class session's QR code

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Value of [`AttendanceTokenClaims::purpose`].
pub const ATTENDANCE_PURPOSE: &str = "attendance";

/// JWT claims for access tokens.
///
/// Everything needed for authorization travels in the token, so guarded
/// handlers do not look the user up again.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    /// User's email address
    pub email: String,
    /// Role name, e.g. `invigilator`
    pub role: String,
    /// Permission names granted by the role
    pub permissions: Vec<String>,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}

/// JWT claims for refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    /// Unique token identifier so two tokens minted in the same second differ
    pub jti: String,
}

/// JWT claims encoded in a class session QR code.
///
/// Students present the token together with their matric number to check in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceTokenClaims {
    /// Class session ID
    pub sid: String,
    /// Always [`ATTENDANCE_PURPOSE`]
    pub purpose: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_serialize() {
        let claims = Claims {
            sub: "user-id-123".to_string(),
            email: "test@example.com".to_string(),
            role: "invigilator".to_string(),
            permissions: vec!["transfers:request".to_string()],
            exp: 1234567890,
            iat: 1234567800,
        };
        let serialized = serde_json::to_string(&claims).unwrap();
        assert!(serialized.contains(r#""sub":"user-id-123""#));
        assert!(serialized.contains(r#""role":"invigilator""#));
    }

    #[test]
    fn test_claims_deserialize() {
        let json = r#"{"sub":"user-id-456","email":"user@test.com","role":"admin","permissions":[],"exp":9999999999,"iat":9999999900}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.sub, "user-id-456");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp, 9999999999);
    }

    #[test]
    fn test_attendance_claims_are_not_access_claims() {
        let claims = AttendanceTokenClaims {
            sid: "session".to_string(),
            purpose: ATTENDANCE_PURPOSE.to_string(),
            exp: 1234567890,
            iat: 1234567800,
            jti: "jti".to_string(),
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(serde_json::from_str::<Claims>(&json).is_err());
    }
}
