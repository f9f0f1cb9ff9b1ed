//! Thin wrapper around the generated `SequencerClient`.
//!
//! Kept separate from [`crate::stream_reader`] so the reconnect state
//! machine can be unit tested against a fake without pulling in a real
//! transport channel.

use sequencer_proto::pb::sequencer_client::SequencerClient;
use sequencer_proto::pb::{StreamTicksRequest, Tick as WireTick};
use tonic::transport::Endpoint;
use tonic::Streaming;

#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    #[error("connect failed: {0}")]
    Connect(#[from] tonic::transport::Error),
    #[error("rpc call failed: {0}")]
    Status(#[from] tonic::Status),
}

/// Connects to the sequencer RPC endpoint and opens the `StreamTicks` call.
pub async fn connect_and_stream(
    url: &str,
    start_tick: u64,
) -> Result<Streaming<WireTick>, RpcClientError> {
    let endpoint = Endpoint::from_shared(url.to_owned())?;
    let channel = endpoint.connect().await?;
    let mut client = SequencerClient::new(channel);
    let response = client
        .stream_ticks(StreamTicksRequest { start_tick })
        .await?;
    Ok(response.into_inner())
}
