//! `GET /metrics` route serving the Prometheus text exposition.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing::error;

use crate::exposition::PrometheusExporter;

/// Router exposing `exporter` at `/metrics`.
pub fn metrics_router(exporter: Arc<PrometheusExporter>) -> Router {
    Router::new().route("/metrics", get(metrics_handler)).with_state(exporter)
}

/// Renders on the blocking pool: a scrape may sample pools synchronously.
async fn metrics_handler(State(exporter): State<Arc<PrometheusExporter>>) -> impl IntoResponse {
    let rendered = tokio::task::spawn_blocking(move || exporter.render()).await;

    match rendered {
        Ok(Ok(body)) => (StatusCode::OK, [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body),
        Ok(Err(e)) => {
            error!(error = %e, "Failed to render metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                format!("# Failed to render metrics: {e}\n"),
            )
        }
        Err(e) => {
            error!(error = %e, "Metrics render task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                format!("# Metrics render task failed: {e}\n"),
            )
        }
    }
}
