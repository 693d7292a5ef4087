use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

use super::controller::{
    assign_incident, delete_incident, get_incident, get_incidents, report_incident,
    update_incident, update_incident_status,
};

pub fn init_incidents_router() -> Router<AppState> {
    Router::new()
        .route("/", post(report_incident).get(get_incidents))
        .route(
            "/{id}",
            get(get_incident).put(update_incident).delete(delete_incident),
        )
        .route("/{id}/assign", patch(assign_incident))
        .route("/{id}/status", patch(update_incident_status))
}
