//! Composite status endpoint (spec §4.4 "Composite status").

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::config::deadlines;
use crate::http::response::service_unavailable;
use crate::rest_client::RestError;
use crate::rpc_client::RpcError;
use crate::state::AppState;

/// Shape of the Continuum REST backend's `/status` response (spec §8
/// scenario 5): `last_60_seconds` is nested, and the backend reports
/// `mean_tick_time_micros`, not an `average_tick_time` field.
#[derive(Debug, Deserialize)]
struct RestStatus {
    chain_height: u64,
    status: String,
    total_transactions: u64,
    last_60_seconds: Last60Seconds,
}

#[derive(Debug, Deserialize)]
struct Last60Seconds {
    ticks_per_second: f64,
    mean_tick_time_micros: f64,
}

impl RestStatus {
    fn ticks_per_second(&self) -> f64 {
        self.last_60_seconds.ticks_per_second
    }

    fn average_tick_time(&self) -> f64 {
        self.last_60_seconds.mean_tick_time_micros / 1000.0
    }
}

/// `GET /continuum/status`.
pub async fn get_status(State(state): State<AppState>) -> Response {
    let rpc_fut = state.rpc_client.get_status(deadlines::COMPOSITE_STATUS);
    let rest_fut = state
        .rest_client
        .get_json::<RestStatus>("/status", deadlines::COMPOSITE_STATUS);

    let (rpc_result, rest_result) = tokio::join!(rpc_fut, rest_fut);

    match (rpc_result, rest_result) {
        (Ok(rpc), Ok(rest)) => Json(json!({
            "status": "ok",
            "data": unified(rest.chain_height, rpc.total_transactions_lifetime, &rest.status,
                rpc.uptime_seconds, rest.total_transactions, rest.ticks_per_second(), rest.average_tick_time()),
        }))
        .into_response(),
        (Err(_rpc_err), Ok(rest)) => Json(json!({
            "status": "partial",
            "warnings": ["gRPC backend unavailable, using REST data only"],
            "data": unified(rest.chain_height, rest.total_transactions, &rest.status,
                0, rest.total_transactions, rest.ticks_per_second(), rest.average_tick_time()),
        }))
        .into_response(),
        (rpc_result, Err(rest_err)) => {
            let rpc_err_text = rpc_result.err().map_or_else(|| "unavailable".to_owned(), |e: RpcError| e.to_string());
            service_unavailable(format!(
                "both backends unavailable: grpc: {rpc_err_text}; rest: {}",
                describe_rest_error(&rest_err)
            ))
        }
    }
}

fn describe_rest_error(e: &RestError) -> String {
    match e {
        RestError::Transport(err) => format!("transport error: {err}"),
        RestError::Status(status) => format!("status {status}"),
        RestError::NotFound => "not found".to_owned(),
    }
}

#[allow(clippy::too_many_arguments)]
fn unified(
    chain_height: u64,
    total_transactions: u64,
    status: &str,
    uptime_seconds: u64,
    rest_total_transactions_60s: u64,
    ticks_per_second: f64,
    average_tick_time: f64,
) -> serde_json::Value {
    json!({
        "chain_height": chain_height,
        "total_transactions": total_transactions,
        "status": status,
        "uptime_seconds": uptime_seconds,
        "txn_per_second": rest_total_transactions_60s as f64 / 60.0,
        "ticks_per_second": ticks_per_second,
        "average_tick_time": average_tick_time,
    })
}
