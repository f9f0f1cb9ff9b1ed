//! Reconnecting client of the sequencer RPC stream (spec §4.6).
//!
//! `Disconnected -> Connecting -> Streaming -> (Recoverable | Fatal)`.
//! A recoverable failure goes back to `Connecting` after a backoff; a
//! fatal failure ends the reader and closes both output channels.

use std::time::Duration;

use sequencer_proto::pb::Tick as WireTick;
use tokio::sync::mpsc;
use tonic::Streaming;
use tracing::{info, warn};

use crate::health::ReadinessFlag;
use crate::rpc_client::{self, RpcClientError};

#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub base: Duration,
    pub max: Duration,
    pub factor: f64,
    pub reconnect_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2.0,
            reconnect_delay: Duration::from_millis(500),
        }
    }
}

/// Whether a stream failure should trigger a reconnect or end the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Recoverable,
    Fatal,
}

/// Classifies a gRPC status the way §4.6 specifies.
pub fn classify_status(status: &tonic::Status) -> ErrorClass {
    use tonic::Code;
    match status.code() {
        Code::Unavailable
        | Code::DeadlineExceeded
        | Code::Cancelled
        | Code::Aborted
        | Code::Internal
        | Code::Unknown => ErrorClass::Recoverable,
        _ => ErrorClass::Fatal,
    }
}

fn classify_rpc_error(err: &RpcClientError) -> ErrorClass {
    match err {
        RpcClientError::Status(status) => classify_status(status),
        // Transport/connect failures are treated as network errors by default.
        RpcClientError::Connect(_) => ErrorClass::Recoverable,
    }
}

/// Runs the reconnect loop until a fatal error or `shutdown` fires, sending
/// ticks on `tick_tx` and informational errors on `error_tx`. Both channels
/// are closed exactly once, on return.
pub async fn run(
    url: String,
    start_tick: u64,
    backoff: BackoffConfig,
    tick_tx: mpsc::Sender<WireTick>,
    error_tx: mpsc::UnboundedSender<String>,
    readiness: ReadinessFlag,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut delay = backoff.base;
    let mut next_start_tick = start_tick;

    loop {
        if *shutdown.borrow() {
            return;
        }

        info!(url = %url, start_tick = next_start_tick, "connecting to sequencer stream");
        let stream = tokio::select! {
            result = rpc_client::connect_and_stream(&url, next_start_tick) => result,
            _ = shutdown.changed() => return,
        };

        let mut stream = match stream {
            Ok(s) => s,
            Err(e) => {
                let _ = error_tx.send(e.to_string());
                if classify_rpc_error(&e) == ErrorClass::Fatal {
                    warn!(error = %e, "fatal error connecting to sequencer stream");
                    return;
                }
                delay = sleep_and_grow(delay, backoff, &mut shutdown).await;
                if *shutdown.borrow() {
                    return;
                }
                continue;
            }
        };

        // A successful connect resets the backoff.
        delay = backoff.base;
        readiness.mark_ready();
        match drain_stream(&mut stream, &tick_tx, &error_tx, &mut next_start_tick, &mut shutdown).await {
            StreamOutcome::Shutdown => return,
            StreamOutcome::CleanEnd => {
                tokio::select! {
                    _ = tokio::time::sleep(backoff.reconnect_delay) => {}
                    _ = shutdown.changed() => return,
                }
            }
            StreamOutcome::Recoverable => {
                delay = sleep_and_grow(delay, backoff, &mut shutdown).await;
                if *shutdown.borrow() {
                    return;
                }
            }
            StreamOutcome::Fatal => return,
        }
    }
}

enum StreamOutcome {
    CleanEnd,
    Recoverable,
    Fatal,
    Shutdown,
}

async fn drain_stream(
    stream: &mut Streaming<WireTick>,
    tick_tx: &mpsc::Sender<WireTick>,
    error_tx: &mpsc::UnboundedSender<String>,
    next_start_tick: &mut u64,
    shutdown: &mut tokio::sync::watch::Receiver<bool>,
) -> StreamOutcome {
    loop {
        let next = tokio::select! {
            item = stream.message() => item,
            _ = shutdown.changed() => return StreamOutcome::Shutdown,
        };

        match next {
            Ok(Some(tick)) => {
                *next_start_tick = tick.tick_number.saturating_add(1);
                if tick_tx.send(tick).await.is_err() {
                    // Downstream closed (pipeline shutting down).
                    return StreamOutcome::Shutdown;
                }
            }
            Ok(None) => return StreamOutcome::CleanEnd,
            Err(status) => {
                let _ = error_tx.send(status.to_string());
                return match classify_status(&status) {
                    ErrorClass::Recoverable => StreamOutcome::Recoverable,
                    ErrorClass::Fatal => StreamOutcome::Fatal,
                };
            }
        }
    }
}

async fn sleep_and_grow(
    current: Duration,
    backoff: BackoffConfig,
    shutdown: &mut tokio::sync::watch::Receiver<bool>,
) -> Duration {
    tokio::select! {
        _ = tokio::time::sleep(current) => {}
        _ = shutdown.changed() => {}
    }
    let grown = current.mul_f64(backoff.factor);
    grown.min(backoff.max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_unavailable_as_recoverable() {
        let status = tonic::Status::unavailable("down");
        assert_eq!(classify_status(&status), ErrorClass::Recoverable);
    }

    #[test]
    fn classifies_permission_denied_as_fatal() {
        let status = tonic::Status::permission_denied("nope");
        assert_eq!(classify_status(&status), ErrorClass::Fatal);
    }

    #[test]
    fn backoff_doubles_and_caps_at_max() {
        let cfg = BackoffConfig::default();
        let mut delay = cfg.base;
        for _ in 0..10 {
            delay = delay.mul_f64(cfg.factor).min(cfg.max);
        }
        assert_eq!(delay, cfg.max);
    }
}
