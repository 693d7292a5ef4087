use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_governor::GovernorLayer;

use crate::middleware::rate_limit::auth_rejection;
use crate::state::AppState;

use super::controller::{change_password, get_current_user, login_user, refresh_token};

pub fn init_auth_router(state: &AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(login_user))
        .route("/refresh", post(refresh_token))
        .route_layer(GovernorLayer::new(state.auth_governor.clone()))
        .route_layer(middleware::map_response(auth_rejection));

    Router::new()
        .route("/me", get(get_current_user))
        .route("/change-password", post(change_password))
        .merge(limited)
}
