//! Prometheus metrics for the telemetry gateway

use crate::error::{GatewayError, Result};
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, TextEncoder, register_counter_vec, register_gauge,
    register_histogram,
};
use std::sync::OnceLock;

/// Global metrics instance
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// All gateway metrics
pub struct Metrics {
    // ─────────────────────────────────────────────────────────────────────────
    // Event counters
    // ─────────────────────────────────────────────────────────────────────────
    /// Events received in events frames (by publisher source)
    pub events_received: CounterVec,

    /// Events published to the topic (by publisher source, outcome)
    pub events_published: CounterVec,

    /// Batches handled (by result category)
    pub batches: CounterVec,

    // ─────────────────────────────────────────────────────────────────────────
    // Latency & streams
    // ─────────────────────────────────────────────────────────────────────────
    /// Time to publish one events frame
    pub publish_duration_seconds: Histogram,

    /// Active RecordEvents streams
    pub active_streams: Gauge,

    /// Events processed per stream, observed when a stream ends
    pub stream_events_processed: Histogram,
}

impl Metrics {
    /// Initialize metrics (call once at startup)
    ///
    /// Returns error if metric registration fails.
    #[allow(clippy::result_large_err)]
    pub fn init() -> Result<&'static Metrics> {
        if let Some(metrics) = METRICS.get() {
            return Ok(metrics);
        }

        let metrics = Metrics {
            events_received: register_counter_vec!(
                "telemetry_gateway_events_received_total",
                "Total events received",
                &["source"]
            )
            .map_err(|e| GatewayError::Metrics(format!("events_received: {e}")))?,

            events_published: register_counter_vec!(
                "telemetry_gateway_events_published_total",
                "Total publish attempts by outcome",
                &["source", "outcome"]
            )
            .map_err(|e| GatewayError::Metrics(format!("events_published: {e}")))?,

            batches: register_counter_vec!(
                "telemetry_gateway_batches_total",
                "Total events batches by result category",
                &["category"]
            )
            .map_err(|e| GatewayError::Metrics(format!("batches: {e}")))?,

            publish_duration_seconds: register_histogram!(
                "telemetry_gateway_publish_duration_seconds",
                "Time spent publishing one events batch",
                // Buckets: 1ms to 30s
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]
            )
            .map_err(|e| GatewayError::Metrics(format!("publish_duration_seconds: {e}")))?,

            active_streams: register_gauge!(
                "telemetry_gateway_active_streams",
                "Number of active RecordEvents streams"
            )
            .map_err(|e| GatewayError::Metrics(format!("active_streams: {e}")))?,

            stream_events_processed: register_histogram!(
                "telemetry_gateway_stream_events_processed",
                "Events processed over the lifetime of one stream",
                // Buckets: 1 to 100k
                vec![1.0, 10.0, 100.0, 1000.0, 5000.0, 10000.0, 50000.0, 100000.0]
            )
            .map_err(|e| GatewayError::Metrics(format!("stream_events_processed: {e}")))?,
        };

        // Set the metrics (only succeeds once)
        let _ = METRICS.set(metrics);

        METRICS
            .get()
            .ok_or_else(|| GatewayError::Metrics("Failed to initialize metrics".to_string()))
    }

    /// Get the global metrics instance
    ///
    /// Returns None if metrics haven't been initialized yet.
    pub fn get() -> Option<&'static Metrics> {
        METRICS.get()
    }

    /// Record events received
    pub fn record_received(&self, source: &str, count: u64) {
        self.events_received
            .with_label_values(&[source])
            .inc_by(count as f64);
    }

    /// Record publish outcomes for one batch
    pub fn record_published(&self, source: &str, succeeded: u64, failed: u64) {
        if succeeded > 0 {
            self.events_published
                .with_label_values(&[source, "success"])
                .inc_by(succeeded as f64);
        }
        if failed > 0 {
            self.events_published
                .with_label_values(&[source, "failure"])
                .inc_by(failed as f64);
        }
    }

    /// Record one batch's result category
    pub fn record_batch(&self, category: &str) {
        self.batches.with_label_values(&[category]).inc();
    }

    /// Record how long publishing one batch took
    pub fn record_publish_duration(&self, seconds: f64) {
        self.publish_duration_seconds.observe(seconds);
    }

    /// Increment active streams
    pub fn inc_streams(&self) {
        self.active_streams.inc();
    }

    /// Decrement active streams and record the stream's event total
    pub fn end_stream(&self, events_processed: u64) {
        self.active_streams.dec();
        self.stream_events_processed.observe(events_processed as f64);
    }
}

/// Gather all metrics and encode as Prometheus text format
///
/// Returns the metrics as a String, ready to be served via HTTP.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_ok() {
        String::from_utf8(buffer).unwrap_or_default()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_init() {
        // Metrics::init() may already have run in another test
        let _ = Metrics::init();
        if let Some(metrics) = Metrics::get() {
            metrics.record_received("licensed_instance", 10);
            metrics.record_published("licensed_instance", 9, 1);
            metrics.record_batch("partial_failure");
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        let first = Metrics::init().map(|m| m as *const Metrics);
        let second = Metrics::init().map(|m| m as *const Metrics);
        if let (Ok(a), Ok(b)) = (first, second) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_gather_contains_registered_series() {
        let _ = Metrics::init();
        if let Some(metrics) = Metrics::get() {
            metrics.record_batch("success");
            assert!(gather().contains("telemetry_gateway_batches_total"));
        }
    }

    #[test]
    fn test_stream_lifecycle() {
        let _ = Metrics::init();
        if let Some(metrics) = Metrics::get() {
            metrics.inc_streams();
            metrics.end_stream(42);
            metrics.record_publish_duration(0.01);
        }
    }
}
