//! Datastore writer abstraction (spec §4.9, §4.10).
//!
//! The pipeline depends on this trait, never on a concrete backend, so
//! tests can swap in an in-memory writer.

use async_trait::async_trait;
use sequencer_proto::Tick;

pub mod console;
pub mod postgres;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("writing {step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[async_trait]
pub trait Writer: Send + Sync {
    /// Writes a batch of ticks atomically. An empty batch is a no-op success.
    async fn write_batch(&self, ticks: &[Tick]) -> Result<(), WriteError>;
}
