pub mod candles;
pub mod config;
pub mod continuum;
pub mod http;
pub mod metrics;
pub mod middleware;
pub mod proxy;
pub mod ratelimit;
pub mod repo;
pub mod rest_client;
pub mod rpc_client;
pub mod state;

pub use state::AppState;

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

/// Assembles the full gateway router (spec §6 "External interfaces") with
/// the middleware chain layered outermost-first (spec §4.1): request-ID,
/// panic recovery, access log, metrics, CORS.
pub fn build_router(state: AppState) -> Router {
    let cors = state.cors.clone();
    let metrics = state.metrics.clone();
    let rate_limiters = state.rate_limiters.clone();

    let api = Router::new()
        .route("/rollup/markets/:market_id/candles", get(candles::get_candles))
        .route("/rollup/*rest", axum::routing::any(rollup_proxy))
        .route(
            "/continuum/tx",
            post(continuum::submit::submit_transaction),
        )
        .route(
            "/continuum/submit-transaction",
            post(continuum::submit::submit_transaction),
        )
        .route("/continuum/tx/batch", post(continuum::submit::submit_batch))
        .route(
            "/continuum/submit-batch",
            post(continuum::submit::submit_batch),
        )
        .route(
            "/continuum/tx/recent",
            get(continuum::tx_lookup::recent_transactions),
        )
        .route(
            "/continuum/tx/:hash",
            get(continuum::tx_lookup::get_transaction_by_hash),
        )
        .route(
            "/continuum/stream-ticks",
            get(continuum::stream::stream_ticks),
        )
        .route("/continuum/status", get(continuum::status::get_status))
        .route(
            "/continuum/transaction",
            get(continuum::direct::get_transaction),
        )
        .route("/continuum/tick", get(continuum::direct::get_tick))
        .route(
            "/continuum/chain-state",
            get(continuum::direct::get_chain_state),
        )
        .route("/continuum/*rest", axum::routing::any(continuum_rest_proxy));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health))
        .route("/ready", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/", get(banner))
        .fallback(not_found)
        // `Router::layer` wraps outward with each call, so the chain is
        // declared innermost-first here to produce the outermost-first
        // execution order spec §4.1 specifies: request-ID, panic recovery,
        // access log, metrics, CORS (rate-limiting sits just inside CORS,
        // after preflight short-circuiting, and just outside the handler).
        .layer(axum::middleware::from_fn_with_state(rate_limiters, middleware::rate_limit::admit))
        .layer(axum::middleware::from_fn_with_state(cors, middleware::cors::apply))
        .layer(axum::middleware::from_fn_with_state(metrics, middleware::metrics::observe))
        .layer(axum::middleware::from_fn(middleware::access_log::log))
        .layer(axum::middleware::from_fn(middleware::recovery::catch_panic))
        .layer(axum::middleware::from_fn(middleware::request_id::stamp))
        .with_state(state)
}

async fn rollup_proxy(State(state): State<AppState>, Path(rest): Path<String>, request: Request) -> Response {
    let downstream = format!("/{rest}");
    state.rollup_proxy.forward(request, &downstream).await
}

async fn continuum_rest_proxy(State(state): State<AppState>, Path(rest): Path<String>, request: Request) -> Response {
    let downstream = format!("/{rest}");
    state.continuum_rest_proxy.forward(request, &downstream).await
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": "1.0.0",
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode(),
    )
}

async fn banner() -> impl IntoResponse {
    Json(json!({
        "service": "sequencer-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> Response {
    http::response::not_found("no route matches this path")
}
