//! HTTP endpoints for jvc-relay.
//!
//! Optional operational surface: health check and Prometheus metrics.
//! Disabled by default so the relay's footprint stays a single listening
//! socket unless monitoring is wanted.

pub mod health;
mod metrics;

use crate::server::RelayMetrics;
use axum::{routing::get, Extension, Router};
use std::sync::Arc;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(metrics: Arc<RelayMetrics>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(Extension(metrics))
}

/// Serve the endpoints until the process exits.
pub async fn serve(bind_address: &str, metrics: Arc<RelayMetrics>) -> crate::error::Result<()> {
    health::init_start_time();

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    tracing::info!("HTTP endpoints on {bind_address}");
    axum::serve(listener, build_router(metrics)).await?;
    Ok(())
}
