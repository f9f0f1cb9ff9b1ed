//! Prometheus metrics for the gateway HTTP surface (spec §4.1.4).

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry, HistogramVec,
    IntCounterVec, Opts, Registry,
};

pub struct GatewayMetrics {
    pub registry: Registry,
    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,
    pub request_size_bytes: HistogramVec,
    pub response_size_bytes: HistogramVec,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = register_int_counter_vec_with_registry!(
            Opts::new("requests_total", "Total HTTP requests handled"),
            &["method", "path", "status"],
            registry
        )
        .expect("failed to register requests_total counter");

        let request_duration_seconds = register_histogram_vec_with_registry!(
            "request_duration_seconds",
            "Request handling duration",
            &["method", "path", "status"],
            registry
        )
        .expect("failed to register request_duration_seconds histogram");

        let request_size_bytes = register_histogram_vec_with_registry!(
            "request_size_bytes",
            "Declared request body size",
            &["method", "path"],
            registry
        )
        .expect("failed to register request_size_bytes histogram");

        let response_size_bytes = register_histogram_vec_with_registry!(
            "response_size_bytes",
            "Bytes written to the response body",
            &["method", "path", "status"],
            registry
        )
        .expect("failed to register response_size_bytes histogram");

        Self {
            registry,
            requests_total,
            request_duration_seconds,
            request_size_bytes,
            response_size_bytes,
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

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
