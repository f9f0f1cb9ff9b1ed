//! Health, readiness, and Prometheus exposition server.
//!
//! Bound separately from the sequencer's own gRPC port so operators can
//! point liveness/readiness probes at it without routing through the
//! data-plane connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::metrics::IngesterMetrics;

/// Flips to `true` the first time the stream reader establishes a
/// connection to the sequencer; `/ready` reports 503 until then.
#[derive(Clone, Default)]
pub struct ReadinessFlag(Arc<AtomicBool>);

impl ReadinessFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct HealthState {
    metrics: Arc<IngesterMetrics>,
    readiness: ReadinessFlag,
}

pub async fn serve(
    addr: SocketAddr,
    metrics: Arc<IngesterMetrics>,
    readiness: ReadinessFlag,
) -> std::io::Result<()> {
    let state = HealthState { metrics, readiness };
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn ready(State(state): State<HealthState>) -> impl IntoResponse {
    if state.readiness.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "stream not yet connected")
    }
}

async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_flag_starts_false() {
        let flag = ReadinessFlag::new();
        assert!(!flag.is_ready());
        flag.mark_ready();
        assert!(flag.is_ready());
    }
}
