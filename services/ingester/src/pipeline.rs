//! Bounded three-stage pipeline (spec §4.8).
//!
//! `reader -> parser pool -> batcher pool -> writer`. All queues are
//! bounded; a slow writer naturally backpressures into the reader, which
//! blocks on `send` and stops pulling from the network.

use std::sync::Arc;
use std::time::Duration;

use sequencer_proto::pb::Tick as WireTick;
use sequencer_proto::Tick;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::metrics::IngesterMetrics;
use crate::parser;
use crate::writer::Writer;

pub struct PipelineConfig {
    pub buffer_size: usize,
    pub worker_count: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub drain_deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_size: 10_000,
            worker_count: 8,
            batch_size: 250,
            flush_interval: Duration::from_millis(100),
            drain_deadline: Duration::from_secs(30),
        }
    }
}

/// Spawns the parser and batcher stages and returns the reader's wire-tick
/// sender. The caller owns the reader task and feeds ticks into it.
pub fn spawn(
    cfg: PipelineConfig,
    writer: Arc<dyn Writer>,
    metrics: Arc<IngesterMetrics>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> (mpsc::Sender<WireTick>, tokio::task::JoinHandle<()>) {
    let (wire_tx, wire_rx) = mpsc::channel::<WireTick>(cfg.buffer_size);
    let (parsed_tx, parsed_rx) = mpsc::channel::<Tick>(cfg.buffer_size);

    let wire_rx = Arc::new(tokio::sync::Mutex::new(wire_rx));
    let parsed_rx = Arc::new(tokio::sync::Mutex::new(parsed_rx));

    let mut parser_handles = Vec::with_capacity(cfg.worker_count);
    for _ in 0..cfg.worker_count {
        let wire_rx = wire_rx.clone();
        let parsed_tx = parsed_tx.clone();
        let metrics = metrics.clone();
        parser_handles.push(tokio::spawn(parser_worker(wire_rx, parsed_tx, metrics)));
    }
    drop(parsed_tx);

    let mut batcher_handles = Vec::with_capacity(cfg.worker_count);
    for _ in 0..cfg.worker_count {
        let parsed_rx = parsed_rx.clone();
        let writer = writer.clone();
        let metrics = metrics.clone();
        batcher_handles.push(tokio::spawn(batcher_worker(
            parsed_rx,
            writer,
            metrics,
            cfg.batch_size,
            cfg.flush_interval,
        )));
    }

    let drain_deadline = cfg.drain_deadline;
    let supervisor = tokio::spawn(async move {
        shutdown.changed().await.ok();
        let all_handles = parser_handles.into_iter().chain(batcher_handles);
        if tokio::time::timeout(drain_deadline, futures_util::future::join_all(all_handles))
            .await
            .is_err()
        {
            warn!("pipeline did not drain within the overall shutdown deadline");
        }
    });

    (wire_tx, supervisor)
}

async fn parser_worker(
    wire_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<WireTick>>>,
    parsed_tx: mpsc::Sender<Tick>,
    metrics: Arc<IngesterMetrics>,
) {
    loop {
        let wire = {
            let mut rx = wire_rx.lock().await;
            rx.recv().await
        };
        let Some(wire) = wire else { return };

        match parser::parse_tick(wire) {
            Ok(tick) => {
                if parsed_tx.send(tick).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                metrics.parse_errors_total.inc();
                debug!(error = %e, "dropping tick that failed parsing");
            }
        }
    }
}

async fn batcher_worker(
    parsed_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Tick>>>,
    writer: Arc<dyn Writer>,
    metrics: Arc<IngesterMetrics>,
    batch_size: usize,
    flush_interval: Duration,
) {
    let mut batch = Vec::with_capacity(batch_size);
    let mut last_flush = Instant::now();

    loop {
        let timeout = flush_interval.saturating_sub(last_flush.elapsed());
        let next = {
            let mut rx = parsed_rx.lock().await;
            tokio::time::timeout(timeout, rx.recv()).await
        };

        match next {
            Ok(Some(tick)) => {
                batch.push(tick);
                if batch.len() >= batch_size {
                    flush(&writer, &metrics, &mut batch).await;
                    last_flush = Instant::now();
                }
            }
            Ok(None) => {
                flush(&writer, &metrics, &mut batch).await;
                return;
            }
            Err(_elapsed) => {
                flush(&writer, &metrics, &mut batch).await;
                last_flush = Instant::now();
            }
        }
    }
}

async fn flush(writer: &Arc<dyn Writer>, metrics: &Arc<IngesterMetrics>, batch: &mut Vec<Tick>) {
    if batch.is_empty() {
        return;
    }
    let timer = metrics.batch_write_duration_seconds.start_timer();
    let result = writer.write_batch(batch).await;
    timer.observe_duration();

    match result {
        Ok(()) => metrics.ticks_ingested_total.inc_by(batch.len() as u64),
        Err(e) => {
            metrics.write_errors_total.inc();
            warn!(error = %e, batch_size = batch.len(), "dropping batch after writer error");
        }
    }
    batch.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriteError;
    use async_trait::async_trait;
    use chrono::Utc;
    use sequencer_proto::VdfProof;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWriter {
        batches: AtomicUsize,
        ticks: AtomicUsize,
    }

    #[async_trait]
    impl Writer for CountingWriter {
        async fn write_batch(&self, ticks: &[Tick]) -> Result<(), WriteError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.ticks.fetch_add(ticks.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    fn sample_tick(n: u64) -> Tick {
        Tick {
            tick_number: n,
            timestamp: Utc::now(),
            vdf_proof: VdfProof {
                input: "in".into(),
                output: "out".into(),
                proof: "proof".into(),
                iterations: 1,
            },
            batch_hash: format!("hash-{n}"),
            previous_output: String::new(),
            transactions: vec![],
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn batcher_flushes_on_size_and_on_channel_close() {
        let writer = Arc::new(CountingWriter {
            batches: AtomicUsize::new(0),
            ticks: AtomicUsize::new(0),
        });
        let metrics = Arc::new(IngesterMetrics::new());
        let (tx, rx) = mpsc::channel::<Tick>(16);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let handle = tokio::spawn(batcher_worker(
            rx,
            writer.clone() as Arc<dyn Writer>,
            metrics,
            2,
            Duration::from_secs(5),
        ));

        for i in 1..=5u64 {
            tx.send(sample_tick(i)).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        assert_eq!(writer.ticks.load(Ordering::SeqCst), 5);
        assert!(writer.batches.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn batcher_flushes_on_timeout_with_a_partial_batch() {
        let writer = Arc::new(CountingWriter {
            batches: AtomicUsize::new(0),
            ticks: AtomicUsize::new(0),
        });
        let metrics = Arc::new(IngesterMetrics::new());
        let (tx, rx) = mpsc::channel::<Tick>(16);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let handle = tokio::spawn(batcher_worker(
            rx,
            writer.clone() as Arc<dyn Writer>,
            metrics,
            250,
            Duration::from_millis(50),
        ));

        tx.send(sample_tick(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        drop(tx);
        handle.await.unwrap();

        assert_eq!(writer.ticks.load(Ordering::SeqCst), 1);
        assert_eq!(writer.batches.load(Ordering::SeqCst), 1);
    }
}
