//! Candle endpoint query validation, exercised without a live database
//! (spec §4.5's validation rules all run before the datastore is touched).

mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

fn app() -> axum::Router {
    let state = support::test_state("http://127.0.0.1:1", "http://127.0.0.1:1", "http://127.0.0.1:1");
    gateway::build_router(state)
}

const MARKET: &str = "550e8400-e29b-41d4-a716-446655440000";

async fn get(uri: String) -> StatusCode {
    app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn rejects_unknown_timeframe() {
    let status = get(format!("/api/v1/rollup/markets/{MARKET}/candles?tf=2h")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejects_limit_out_of_range() {
    assert_eq!(
        get(format!("/api/v1/rollup/markets/{MARKET}/candles?limit=0")).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        get(format!("/api/v1/rollup/markets/{MARKET}/candles?limit=1001")).await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn rejects_malformed_rfc3339_bounds() {
    assert_eq!(
        get(format!("/api/v1/rollup/markets/{MARKET}/candles?from=not-a-date")).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        get(format!("/api/v1/rollup/markets/{MARKET}/candles?to=not-a-date")).await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn rejects_from_after_to() {
    let status = get(format!(
        "/api/v1/rollup/markets/{MARKET}/candles?from=2026-01-02T00:00:00Z&to=2026-01-01T00:00:00Z"
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejects_window_wider_than_thirty_days() {
    let status = get(format!(
        "/api/v1/rollup/markets/{MARKET}/candles?from=2026-01-01T00:00:00Z&to=2026-03-01T00:00:00Z"
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejects_malformed_market_id() {
    let status = get("/api/v1/rollup/markets/not-a-uuid/candles".to_owned()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn valid_query_passes_validation_and_fails_at_the_missing_datastore() {
    let status = get(format!("/api/v1/rollup/markets/{MARKET}/candles?tf=1h")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
