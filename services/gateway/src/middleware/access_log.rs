//! Structured access logging (spec §4.1.3).
//!
//! Log level is chosen by response status: >=500 error, 404 debug, other
//! 4xx warn, else info.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, error, info, warn};

use super::request_id::RequestId;

pub async fn log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_owned());
    let user_agent = request
        .headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let started = Instant::now();
    let response = next.run(request).await;
    let duration = started.elapsed();
    let status = response.status();

    let duration_ms = duration.as_secs_f64() * 1000.0;
    if status.as_u16() >= 500 {
        error!(%method, %path, status = status.as_u16(), duration_ms, %remote_addr, %user_agent, %request_id, "request completed");
    } else if status == StatusCode::NOT_FOUND {
        debug!(%method, %path, status = status.as_u16(), duration_ms, %remote_addr, %user_agent, %request_id, "request completed");
    } else if status.is_client_error() {
        warn!(%method, %path, status = status.as_u16(), duration_ms, %remote_addr, %user_agent, %request_id, "request completed");
    } else {
        info!(%method, %path, status = status.as_u16(), duration_ms, %remote_addr, %user_agent, %request_id, "request completed");
    }

    response
}
