//! Composite status fallback (spec §8 end-to-end scenario: gRPC backend
//! down, REST backend up -> 200 "partial" with the gRPC warning).

mod support;

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

async fn spawn_mock_rest_status() -> SocketAddr {
    let router = axum::Router::new().route(
        "/status",
        get(|| async {
            axum::Json(json!({
                "chain_height": 100,
                "total_transactions": 600,
                "status": "running",
                "last_60_seconds": {
                    "ticks_per_second": 1.0,
                    "mean_tick_time_micros": 1000.0,
                },
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn grpc_down_rest_up_yields_partial_status_with_warning() {
    let rest_addr = spawn_mock_rest_status().await;
    let rest_url = format!("http://{rest_addr}");

    let state = support::test_state(&rest_url, &rest_url, "http://127.0.0.1:1");
    let app = gateway::build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/continuum/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "partial");
    assert!(json["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w.as_str().unwrap().contains("gRPC backend unavailable")));
    assert_eq!(json["data"]["chain_height"], 100);
    assert_eq!(json["data"]["uptime_seconds"], 0);
    assert_eq!(json["data"]["txn_per_second"], 10.0);
}

#[tokio::test]
async fn both_backends_down_yields_503_naming_both_failures() {
    let state = support::test_state("http://127.0.0.1:1", "http://127.0.0.1:1", "http://127.0.0.1:1");
    let app = gateway::build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/continuum/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("grpc"));
    assert!(text.contains("rest"));
}
