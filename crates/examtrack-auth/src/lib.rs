//! # ExamTrack Auth
//!
//! JWT claims and token helpers for the ExamTrack API.
//!
//! - **Access token** ([`Claims`]): short-lived, carries role and permissions
//! - **Refresh token** ([`RefreshTokenClaims`]): long-lived, exchanged for a new pair
//! - **Attendance token** ([`AttendanceTokenClaims`]): encoded in a class session QR code

pub mod claims;
pub mod jwt;

pub use claims::{ATTENDANCE_PURPOSE, AttendanceTokenClaims, Claims, RefreshTokenClaims};
pub use jwt::{
    create_access_token, create_attendance_token, create_refresh_token, verify_attendance_token,
    verify_refresh_token, verify_token,
};
