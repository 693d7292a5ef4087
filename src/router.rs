use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::modules::analytics::router::init_analytics_router;
use crate::modules::attendance::router::{init_attendance_router, init_class_sessions_router};
use crate::modules::audit::router::init_audit_router;
use crate::modules::auth::router::init_auth_router;
use crate::modules::batch_transfers::router::init_batch_transfers_router;
use crate::modules::events::router::init_events_router;
use crate::modules::exam_sessions::router::init_exam_sessions_router;
use crate::modules::incidents::router::init_incidents_router;
use crate::modules::students::router::init_students_router;
use crate::modules::users::router::init_users_router;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest(
            "/api",
            Router::new()
                .nest("/auth", init_auth_router(&state))
                .nest("/users", init_users_router())
                .nest("/students", init_students_router())
                .nest("/exam-sessions", init_exam_sessions_router())
                .nest("/transfers", init_batch_transfers_router())
                .nest("/incidents", init_incidents_router())
                .nest("/class-sessions", init_class_sessions_router())
                .nest("/attendance", init_attendance_router(&state))
                .nest("/audit-logs", init_audit_router())
                .nest("/analytics", init_analytics_router())
                .nest("/events", init_events_router()),
        )
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
