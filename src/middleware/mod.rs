//! Middleware and extractors for cross-cutting request concerns.
//!
//! - [`auth`]: access token extractor and permission-based access control
//! - [`rate_limit`]: per-IP limits for login, refresh and public check-in
//! - [`role`]: admin extractor and ownership checks
//!
//! # Authentication Flow
//!
//! 1. Client sends request with `Authorization: Bearer <token>` header
//! 2. `AuthUser` extractor validates the JWT and extracts claims
//! 3. Permission extractors check if the user has required permissions
//! 4. Handler executes if all checks pass
//!
//! ```ignore
//! use crate::middleware::auth::RequireTransfersRespond;
//!
//! async fn confirm_transfer(
//!     RequireTransfersRespond(auth_user): RequireTransfersRespond,
//! ) -> impl IntoResponse {
//!     // Only executes if user has "transfers:respond" permission
//! }
//! ```

pub mod auth;
pub mod rate_limit;
pub mod role;
