//! Direct RPC bindings (spec §6: `/continuum/transaction`, `/continuum/tick`,
//! `/continuum/chain-state`).

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use sequencer_proto::pb;
use serde::Deserialize;
use serde_json::json;

use crate::config::deadlines;
use crate::continuum::json::{tick_to_json, transaction_to_json};
use crate::http::response::{bad_request, internal_error};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TransactionQuery {
    hash: String,
}

/// `GET /continuum/transaction?hash=…`.
pub async fn get_transaction(State(state): State<AppState>, Query(q): Query<TransactionQuery>) -> Response {
    let request = pb::GetTransactionRequest { tx_hash: q.hash };
    match state.rpc_client.get_transaction(request, deadlines::POINT_QUERY).await {
        Ok(resp) => Json(json!({
            "transaction": resp.transaction.as_ref().map(transaction_to_json),
            "tick_number": resp.tick_number,
        }))
        .into_response(),
        Err(e) => internal_error(format!("grpc call failed: {e}")),
    }
}

#[derive(Deserialize)]
pub struct TickQuery {
    number: u64,
}

/// `GET /continuum/tick?number=…`.
pub async fn get_tick(State(state): State<AppState>, Query(q): Query<TickQuery>) -> Response {
    let request = pb::GetTickRequest { tick_number: q.number };
    match state.rpc_client.get_tick(request, deadlines::POINT_QUERY).await {
        Ok(resp) => Json(json!({ "tick": resp.tick.as_ref().map(tick_to_json) })).into_response(),
        Err(e) => internal_error(format!("grpc call failed: {e}")),
    }
}

#[derive(Deserialize)]
pub struct ChainStateQuery {
    tick_limit: u32,
}

/// `GET /continuum/chain-state?tick_limit=…`.
pub async fn get_chain_state(State(state): State<AppState>, Query(q): Query<ChainStateQuery>) -> Response {
    if q.tick_limit == 0 {
        return bad_request("tick_limit must be positive");
    }
    let request = pb::GetChainStateRequest { tick_limit: q.tick_limit };
    match state.rpc_client.get_chain_state(request, deadlines::UNARY_RPC).await {
        Ok(resp) => Json(json!({
            "recent_ticks": resp.recent_ticks.iter().map(tick_to_json).collect::<Vec<_>>(),
            "chain_height": resp.chain_height,
        }))
        .into_response(),
        Err(e) => internal_error(format!("grpc call failed: {e}")),
    }
}
