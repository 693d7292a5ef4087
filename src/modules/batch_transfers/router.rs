use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    cancel_transfer, confirm_transfer, get_transfer, get_transfers, reject_transfer,
    report_discrepancy, request_transfer,
};

pub fn init_batch_transfers_router() -> Router<AppState> {
    Router::new()
        .route("/", post(request_transfer).get(get_transfers))
        .route("/{id}", get(get_transfer))
        .route("/{id}/confirm", post(confirm_transfer))
        .route("/{id}/reject", post(reject_transfer))
        .route("/{id}/cancel", post(cancel_transfer))
        .route("/{id}/discrepancy", post(report_discrepancy))
}
