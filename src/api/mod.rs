//! HTTP surface over the rate manager and the pricing formula.

pub mod handlers;

use crate::core::manager::RateManager;
use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub fn router(manager: Arc<RateManager>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/calculate", post(handlers::calculate_price))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}

/// Serves the API on `addr` until Ctrl-C.
pub async fn serve(manager: Arc<RateManager>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "Web server listening");

    axum::serve(listener, router(manager))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")?;

    info!("Web server has been closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
