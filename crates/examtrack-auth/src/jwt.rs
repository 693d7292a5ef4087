//! Token creation and verification.
//!
//! All tokens are HS256 JWTs signed with `JWT_SECRET`. Access and refresh
//! lifetimes come from [`JwtConfig`], the attendance QR token lifetime from
//! `AttendanceConfig` and is passed in by the caller.
//!
//! ```ignore
//! use examtrack_auth::{create_access_token, verify_token};
//!
//! let token = create_access_token(user_id, "ada@uni.edu", "lecturer", perms, &config)?;
//! let claims = verify_token(&token, &config)?;
//! ```

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use examtrack_config::JwtConfig;
use examtrack_core::AppError;

use crate::claims::{ATTENDANCE_PURPOSE, AttendanceTokenClaims, Claims, RefreshTokenClaims};

fn now() -> usize {
    Utc::now().timestamp() as usize
}

fn sign<T: Serialize>(claims: &T, secret: &str, kind: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create {}: {}", kind, e)))
}

fn decode_claims<T: DeserializeOwned>(token: &str, secret: &str) -> Option<T> {
    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Creates an access token embedding the user's role and permissions.
///
/// # Errors
///
/// Returns an internal error if encoding fails.
pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    role: &str,
    permissions: Vec<String>,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let iat = now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        permissions,
        exp: iat + jwt_config.access_token_expiry.max(0) as usize,
        iat,
    };

    sign(&claims, &jwt_config.secret, "token")
}

/// Verifies an access token and returns the embedded claims.
///
/// # Errors
///
/// Returns 401 when the signature is wrong, the token expired or is malformed.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode_claims(token, &jwt_config.secret)
        .ok_or_else(|| AppError::unauthorized("Invalid or expired token".to_string()))
}

pub fn create_refresh_token(
    user_id: Uuid,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let iat = now();
    let claims = RefreshTokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: iat + jwt_config.refresh_token_expiry.max(0) as usize,
        iat,
        jti: Uuid::new_v4().to_string(),
    };

    sign(&claims, &jwt_config.secret, "refresh token")
}

pub fn verify_refresh_token(
    token: &str,
    jwt_config: &JwtConfig,
) -> Result<RefreshTokenClaims, AppError> {
    decode_claims(token, &jwt_config.secret)
        .ok_or_else(|| AppError::unauthorized("Invalid or expired refresh token".to_string()))
}

/// Creates the token shown as a QR code for a class session.
///
/// Returns the token together with its expiry as a Unix timestamp.
pub fn create_attendance_token(
    class_session_id: Uuid,
    ttl_seconds: i64,
    jwt_config: &JwtConfig,
) -> Result<(String, usize), AppError> {
    let iat = now();
    let exp = iat + ttl_seconds.max(1) as usize;
    let claims = AttendanceTokenClaims {
        sid: class_session_id.to_string(),
        purpose: ATTENDANCE_PURPOSE.to_string(),
        exp,
        iat,
        jti: Uuid::new_v4().to_string(),
    };

    let token = sign(&claims, &jwt_config.secret, "attendance token")?;
    Ok((token, exp))
}

/// Verifies an attendance token and returns the class session it was issued for.
///
/// # Errors
///
/// Returns 401 for expired, forged or non-attendance tokens.
pub fn verify_attendance_token(token: &str, jwt_config: &JwtConfig) -> Result<Uuid, AppError> {
    let invalid = || AppError::unauthorized("Invalid or expired attendance token".to_string());

    let claims: AttendanceTokenClaims =
        decode_claims(token, &jwt_config.secret).ok_or_else(invalid)?;

    if claims.purpose != ATTENDANCE_PURPOSE {
        return Err(invalid());
    }

    Uuid::parse_str(&claims.sid).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        }
    }

    #[test]
    fn test_verify_token_success() {
        let config = get_test_jwt_config();
        let user_id = Uuid::new_v4();

        let token = create_access_token(
            user_id,
            "test@example.com",
            "lecturer",
            vec!["attendance:manage".to_string()],
            &config,
        )
        .unwrap();

        let claims = verify_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.role, "lecturer");
        assert_eq!(claims.permissions, vec!["attendance:manage".to_string()]);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_verify_token_invalid() {
        let config = get_test_jwt_config();
        let err = verify_token("invalid-token", &config).unwrap_err();
        assert_eq!(err.status.as_u16(), 401);
    }

    #[test]
    fn test_verify_token_wrong_secret() {
        let config = get_test_jwt_config();
        let token =
            create_access_token(Uuid::new_v4(), "a@b.com", "admin", vec![], &config).unwrap();

        let wrong_config = JwtConfig {
            secret: "different-secret-key-at-least-32-characters".to_string(),
            ..config
        };

        assert!(verify_token(&token, &wrong_config).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = get_test_jwt_config();
        let iat = now() - 7200;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "old@example.com".to_string(),
            role: "admin".to_string(),
            permissions: vec![],
            exp: iat + 60,
            iat,
        };
        let token = sign(&claims, &config.secret, "token").unwrap();
        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let config = get_test_jwt_config();
        let user_id = Uuid::new_v4();

        let token = create_refresh_token(user_id, "test@example.com", &config).unwrap();
        let claims = verify_refresh_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let config = get_test_jwt_config();
        let user_id = Uuid::new_v4();
        let a = create_refresh_token(user_id, "x@example.com", &config).unwrap();
        let b = create_refresh_token(user_id, "x@example.com", &config).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_refresh_token_expiry_longer_than_access() {
        let config = get_test_jwt_config();
        let user_id = Uuid::new_v4();

        let access = create_access_token(user_id, "t@e.com", "admin", vec![], &config).unwrap();
        let refresh = create_refresh_token(user_id, "t@e.com", &config).unwrap();

        let access_claims = verify_token(&access, &config).unwrap();
        let refresh_claims = verify_refresh_token(&refresh, &config).unwrap();

        assert!(refresh_claims.exp > access_claims.exp);
    }

    #[test]
    fn test_attendance_token_round_trip() {
        let config = get_test_jwt_config();
        let session_id = Uuid::new_v4();

        let (token, exp) = create_attendance_token(session_id, 300, &config).unwrap();
        assert!(exp >= now() + 299);

        let decoded = verify_attendance_token(&token, &config).unwrap();
        assert_eq!(decoded, session_id);
    }

    #[test]
    fn test_access_token_is_not_an_attendance_token() {
        let config = get_test_jwt_config();
        let token =
            create_access_token(Uuid::new_v4(), "a@b.com", "admin", vec![], &config).unwrap();
        assert!(verify_attendance_token(&token, &config).is_err());
    }

    #[test]
    fn test_attendance_token_with_wrong_purpose_is_rejected() {
        let config = get_test_jwt_config();
        let iat = now();
        let claims = AttendanceTokenClaims {
            sid: Uuid::new_v4().to_string(),
            purpose: "something-else".to_string(),
            exp: iat + 300,
            iat,
            jti: Uuid::new_v4().to_string(),
        };
        let token = sign(&claims, &config.secret, "attendance token").unwrap();
        assert!(verify_attendance_token(&token, &config).is_err());
    }
}
