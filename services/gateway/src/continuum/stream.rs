//! RPC-streaming-ticks to SSE bridge (spec §4.4 "Streaming ticks -> SSE").

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::stream;
use serde::Deserialize;

use crate::continuum::json::tick_to_json;
use crate::http::response::internal_error;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StreamTicksQuery {
    #[serde(default)]
    start_tick: u64,
}

/// `GET /continuum/stream-ticks?start_tick=<u64>`. Terminates cleanly on
/// stream end, RPC error, or client disconnect (the latter is handled by
/// axum dropping this stream when the connection closes).
pub async fn stream_ticks(State(state): State<AppState>, Query(q): Query<StreamTicksQuery>) -> Response {
    let streaming = match state.rpc_client.stream_ticks(q.start_tick).await {
        Ok(streaming) => streaming,
        Err(e) => return internal_error(format!("grpc call failed: {e}")),
    };

    let event_stream = stream::unfold(Some(streaming), |state| async move {
        let mut streaming = state?;
        match streaming.message().await {
            Ok(Some(tick)) => {
                let event: Result<Event, Infallible> = Ok(Event::default().data(tick_to_json(&tick).to_string()));
                Some((event, Some(streaming)))
            }
            Ok(None) => None,
            Err(status) => {
                tracing::warn!(error = %status, "stream-ticks rpc error");
                None
            }
        }
    });

    Sse::new(event_stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keepalive"))
        .into_response()
}
