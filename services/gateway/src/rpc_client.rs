//! Typed RPC client over a long-lived connection to the sequencer (spec
//! §4.4). One shared handle per configured endpoint; the generated
//! `SequencerClient` is cheaply `Clone` (it wraps a `tonic::Channel`), so
//! every request clones the handle rather than opening a new connection.

use std::time::Duration;

use sequencer_proto::pb::sequencer_client::SequencerClient;
use sequencer_proto::pb::{
    GetChainStateRequest, GetChainStateResponse, GetStatusRequest, GetStatusResponse,
    GetTickRequest, GetTickResponse, GetTransactionRequest, GetTransactionResponse,
    SubmitBatchRequest, SubmitBatchResponse, SubmitTransactionRequest, SubmitTransactionResponse,
    Tick as WireTick,
};
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Streaming};

const POINT_QUERY_RECV_LIMIT: usize = 10 * 1024 * 1024;
const STREAM_RECV_LIMIT: usize = 100 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("connect failed: {0}")]
    Connect(#[from] tonic::transport::Error),
    #[error("grpc call failed: {0}")]
    Status(#[from] tonic::Status),
    #[error("grpc call failed: deadline exceeded")]
    Timeout,
}

#[derive(Clone)]
pub struct RpcClient {
    channel: Channel,
}

impl RpcClient {
    /// Connects lazily: the first RPC call establishes the connection, and
    /// the gateway owns this one handle for the lifetime of the process
    /// (spec §3 "Ownership").
    pub fn connect_lazy(url: &str) -> Result<Self, RpcError> {
        let channel = Endpoint::from_shared(url.to_owned())?.connect_lazy();
        Ok(Self { channel })
    }

    fn client(&self, recv_limit: usize) -> SequencerClient<Channel> {
        SequencerClient::new(self.channel.clone()).max_decoding_message_size(recv_limit)
    }

    async fn call_with_deadline<F, Fut, T>(deadline: Duration, f: F) -> Result<T, RpcError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, tonic::Status>>,
    {
        match tokio::time::timeout(deadline, f()).await {
            Ok(result) => result.map_err(RpcError::from),
            Err(_) => Err(RpcError::Timeout),
        }
    }

    pub async fn submit_transaction(
        &self,
        req: SubmitTransactionRequest,
        deadline: Duration,
    ) -> Result<SubmitTransactionResponse, RpcError> {
        let mut client = self.client(POINT_QUERY_RECV_LIMIT);
        Self::call_with_deadline(deadline, || async move {
            client.submit_transaction(Request::new(req)).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn submit_batch(
        &self,
        req: SubmitBatchRequest,
        deadline: Duration,
    ) -> Result<SubmitBatchResponse, RpcError> {
        let mut client = self.client(STREAM_RECV_LIMIT);
        Self::call_with_deadline(deadline, || async move {
            client.submit_batch(Request::new(req)).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn get_status(&self, deadline: Duration) -> Result<GetStatusResponse, RpcError> {
        let mut client = self.client(POINT_QUERY_RECV_LIMIT);
        Self::call_with_deadline(deadline, || async move {
            client.get_status(Request::new(GetStatusRequest {})).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn get_transaction(
        &self,
        req: GetTransactionRequest,
        deadline: Duration,
    ) -> Result<GetTransactionResponse, RpcError> {
        let mut client = self.client(POINT_QUERY_RECV_LIMIT);
        Self::call_with_deadline(deadline, || async move {
            client.get_transaction(Request::new(req)).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn get_tick(&self, req: GetTickRequest, deadline: Duration) -> Result<GetTickResponse, RpcError> {
        let mut client = self.client(POINT_QUERY_RECV_LIMIT);
        Self::call_with_deadline(deadline, || async move {
            client.get_tick(Request::new(req)).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn get_chain_state(
        &self,
        req: GetChainStateRequest,
        deadline: Duration,
    ) -> Result<GetChainStateResponse, RpcError> {
        let mut client = self.client(STREAM_RECV_LIMIT);
        Self::call_with_deadline(deadline, || async move {
            client.get_chain_state(Request::new(req)).await.map(|r| r.into_inner())
        })
        .await
    }

    /// Opens the `StreamTicks` server-streaming call. No per-message
    /// deadline is applied; the caller drives the stream until end,
    /// error, or client disconnect (spec §4.4 "Streaming ticks -> SSE").
    pub async fn stream_ticks(&self, start_tick: u64) -> Result<Streaming<WireTick>, RpcError> {
        let mut client = self.client(STREAM_RECV_LIMIT);
        let response = client
            .stream_ticks(Request::new(sequencer_proto::pb::StreamTicksRequest { start_tick }))
            .await?;
        Ok(response.into_inner())
    }
}
