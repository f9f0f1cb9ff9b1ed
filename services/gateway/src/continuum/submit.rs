//! Unary submit endpoints (spec §4.4 "Unary submit / query", §6).

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sequencer_proto::pb;
use serde_json::json;

use crate::config::deadlines;
use crate::continuum::json::TransactionInput;
use crate::http::response::internal_error;
use crate::state::AppState;

/// `POST /continuum/tx` and `/continuum/submit-transaction`.
pub async fn submit_transaction(State(state): State<AppState>, Json(input): Json<TransactionInput>) -> Response {
    let request = pb::SubmitTransactionRequest {
        transaction: Some(input.into()),
    };
    match state.rpc_client.submit_transaction(request, deadlines::UNARY_RPC).await {
        Ok(resp) => Json(json!({ "tx_hash": resp.tx_hash, "accepted": resp.accepted })).into_response(),
        Err(e) => internal_error(format!("grpc call failed: {e}")),
    }
}

#[derive(serde::Deserialize)]
pub struct SubmitBatchInput {
    pub transactions: Vec<TransactionInput>,
}

/// `POST /continuum/tx/batch` and `/continuum/submit-batch`.
pub async fn submit_batch(State(state): State<AppState>, Json(input): Json<SubmitBatchInput>) -> Response {
    let request = pb::SubmitBatchRequest {
        transactions: input.transactions.into_iter().map(Into::into).collect(),
    };
    match state.rpc_client.submit_batch(request, deadlines::BATCH_SUBMIT).await {
        Ok(resp) => Json(json!({
            "accepted_count": resp.accepted_count,
            "rejected_tx_ids": resp.rejected_tx_ids,
        }))
        .into_response(),
        Err(e) => internal_error(format!("grpc call failed: {e}")),
    }
}
