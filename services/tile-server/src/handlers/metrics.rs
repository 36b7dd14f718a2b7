//! Health checks, readiness and Prometheus metrics.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tracing::instrument;

use crate::state::AppState;

// ============================================================================
// Health Checks
// ============================================================================

/// GET /health - Liveness check
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// GET /ready - Readiness check with worker pool and dataset summary
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let pool = &state.pool;
    let closed = pool.is_closed();
    let status = if closed {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let setups: Vec<_> = state
        .sequence
        .setups()
        .iter()
        .map(|s| json!({ "id": s.id, "label": s.label }))
        .collect();

    let body = json!({
        "status": if closed { "closed" } else { "ready" },
        "dataset": state.dataset_name,
        "pool": {
            "size": pool.size(),
            "busy": pool.busy(),
            "peak_busy": pool.peak_busy(),
        },
        "setups": setups,
        "timepoints": state.sequence.num_timepoints(),
        "config": state.config,
        "started_at": state.started_at.to_rfc3339(),
        "uptime_seconds": (Utc::now() - state.started_at).num_seconds(),
    });

    (status, Json(body)).into_response()
}

// ============================================================================
// Prometheus Metrics
// ============================================================================

/// GET /metrics - Prometheus metrics endpoint
#[instrument(skip(state, prometheus))]
pub async fn metrics_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(prometheus): Extension<PrometheusHandle>,
) -> Response {
    metrics::gauge!("tile_pool_busy_workers").set(state.pool.busy() as f64);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        prometheus.render(),
    )
        .into_response()
}
