use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::stream_events;

pub fn init_events_router() -> Router<AppState> {
    Router::new().route("/", get(stream_events))
}
