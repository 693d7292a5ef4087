use std::net::SocketAddr;

use dotenvy::dotenv;
use examtrack::logging::{init_tracing, shutdown_tracer};
use examtrack::middleware::rate_limit::spawn_limiter_pruning;
use examtrack::metrics::{init_metrics, metrics_app};
use examtrack::router::init_router;
use examtrack::state::init_app_state;
use examtrack_config::ServerConfig;
use examtrack_db::run_migrations;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let server_config = ServerConfig::from_env();

    let state = init_app_state().await?;
    run_migrations(&state.db).await?;

    if let Some(handle) = init_metrics() {
        let metrics_address = server_config.metrics_bind_address();
        let metrics_listener = tokio::net::TcpListener::bind(&metrics_address).await?;
        tracing::info!(address = %metrics_address, "Metrics listener started");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_app(handle)).await {
                tracing::error!(error = %e, "Metrics server stopped");
            }
        });
    }

    spawn_limiter_pruning(&state);
    let app = init_router(state);

    let address = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    println!("🚀 Server running on http://{}", address);
    println!("📚 Swagger UI available at http://{}/swagger-ui", address);
    println!("📖 Scalar UI available at http://{}/scalar", address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    shutdown_tracer().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
