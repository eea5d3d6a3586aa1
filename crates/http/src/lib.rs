//! HTTP server facade for Annexx: liveness and database health endpoints.

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};

use annexx_db::DatabaseRouter;
use annexx_kernel::settings::Settings;

pub mod error;
pub mod health;
pub mod router;

use error::AppError;
use router::RouterBuilder;

/// Start the HTTP server and run until Ctrl-C
pub async fn start_server(settings: &Settings, databases: Arc<DatabaseRouter>) -> anyhow::Result<()> {
    let address = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!("starting HTTP server on {}", address);

    let app = build_router(settings, databases);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {address}"))?;

    tracing::info!(
        "HTTP server listening on {}://{}:{}",
        settings.server.protocol(),
        settings.server.public_host,
        settings.server.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Build the application router
///
/// The liveness route is added after the tracing layer so load balancer
/// checks stay out of request logs.
pub fn build_router(settings: &Settings, databases: Arc<DatabaseRouter>) -> Router {
    RouterBuilder::new()
        .merge(health::routes(databases))
        .merge(Router::new().fallback(|| async { AppError::not_found("route not found") }))
        .with_tracing()
        .route(&settings.server.health_path, get(health::up))
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .build()
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
