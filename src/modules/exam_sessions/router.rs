use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

use super::controller::{
    assign_invigilator, create_exam_session, delete_exam_session, get_custody_chain,
    get_exam_session, get_exam_sessions, update_exam_session, update_exam_session_status,
};

pub fn init_exam_sessions_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_exam_session).get(get_exam_sessions))
        .route(
            "/{id}",
            get(get_exam_session)
                .put(update_exam_session)
                .delete(delete_exam_session),
        )
        .route("/{id}/status", patch(update_exam_session_status))
        .route("/{id}/invigilator", patch(assign_invigilator))
        .route("/{id}/custody", get(get_custody_chain))
}
