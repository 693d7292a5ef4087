use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_user, delete_user, get_handlers, get_user, get_users, update_user,
};

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user).get(get_users))
        .route("/handlers", get(get_handlers))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}
