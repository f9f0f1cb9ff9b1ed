//! Prometheus metrics for the tick ingester pipeline.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Histogram, HistogramOpts,
    IntCounter, Opts, Registry,
};

pub struct IngesterMetrics {
    pub registry: Registry,

    /// Ticks that failed parsing/validation and were skipped (§7).
    pub parse_errors_total: IntCounter,
    /// Batches that failed to write and were dropped (§7).
    pub write_errors_total: IntCounter,
    /// Ticks successfully committed to the datastore.
    pub ticks_ingested_total: IntCounter,
    /// Wall-clock time spent inside `write_batch`, per batch.
    pub batch_write_duration_seconds: Histogram,
}

impl IngesterMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let parse_errors_total = register_int_counter_with_registry!(
            Opts::new("parse_errors_total", "Ticks rejected by the parser"),
            registry
        )
        .expect("failed to register parse_errors_total counter");

        let write_errors_total = register_int_counter_with_registry!(
            Opts::new("write_errors_total", "Batches dropped due to a writer error"),
            registry
        )
        .expect("failed to register write_errors_total counter");

        let ticks_ingested_total = register_int_counter_with_registry!(
            Opts::new("ticks_ingested_total", "Ticks successfully persisted"),
            registry
        )
        .expect("failed to register ticks_ingested_total counter");

        let batch_write_duration_seconds = register_histogram_with_registry!(
            HistogramOpts::new(
                "batch_write_duration_seconds",
                "Time spent inside writer.write_batch"
            )
            .buckets(prometheus::exponential_buckets(0.001, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register batch_write_duration_seconds histogram");

        Self {
            registry,
            parse_errors_total,
            write_errors_total,
            ticks_ingested_total,
            batch_write_duration_seconds,
        }
    }

    pub fn encode(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&metric_families, &mut buf)
            .expect("prometheus text encoding never fails for valid metrics");
        String::from_utf8(buf).expect("prometheus text encoder always produces valid utf8")
    }
}

impl Default for IngesterMetrics {
    fn default() -> Self {
        Self::new()
    }
}
