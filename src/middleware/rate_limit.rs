//! Per-client rate limiting for unauthenticated endpoints.
//!
//! Route groups are wrapped in a `tower_governor::GovernorLayer` built from
//! the configs held in [`AppState`]. Its 429 response is rewritten into the
//! JSON error body every other endpoint uses.
//!
//! ```ignore
//! Router::new()
//!     .route("/login", post(login_user))
//!     .route_layer(GovernorLayer::new(state.auth_governor.clone()))
//!     .route_layer(middleware::map_response(auth_rejection));
//! ```

use std::time::Duration;

use axum::{
    http::{StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use examtrack_core::AppError;

use crate::metrics::track_rate_limited;
use crate::state::AppState;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

pub async fn auth_rejection(response: Response) -> Response {
    json_rejection(response, "auth")
}

pub async fn public_rejection(response: Response) -> Response {
    json_rejection(response, "public")
}

fn json_rejection(response: Response, scope: &'static str) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }

    tracing::warn!(scope, "Rate limit exceeded");
    track_rate_limited(scope);

    let retry_after = response.headers().get(RETRY_AFTER).cloned();
    let mut rejection =
        AppError::too_many_requests("Too many requests, please slow down".to_string())
            .into_response();
    if let Some(value) = retry_after {
        rejection.headers_mut().insert(RETRY_AFTER, value);
    }
    rejection
}

/// Drops idle client buckets so spoofed forwarding headers cannot grow the
/// key store without bound.
pub fn spawn_limiter_pruning(state: &AppState) {
    let governors = [state.auth_governor.clone(), state.public_governor.clone()];
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            for governor in &governors {
                let limiter = governor.limiter();
                limiter.retain_recent();
                tracing::debug!(clients = limiter.len(), "Pruned rate limiter");
            }
        }
    });
}
