//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming. Recording is a no-op until
//! a recorder is installed, so library code records unconditionally.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Lumen metrics
pub const METRICS_PREFIX: &str = "lumen";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_feedback_submitted_total", METRICS_PREFIX),
        Unit::Count,
        "Feedback rows created"
    );

    describe_counter!(
        format!("{}_feedback_transitions_total", METRICS_PREFIX),
        Unit::Count,
        "Feedback status transitions performed by admins"
    );

    describe_counter!(
        format!("{}_reports_rendered_total", METRICS_PREFIX),
        Unit::Count,
        "PDF reports rendered"
    );

    describe_histogram!(
        format!("{}_report_size_bytes", METRICS_PREFIX),
        Unit::Bytes,
        "Size of rendered PDF reports"
    );

    describe_counter!(
        format!("{}_emails_sent_total", METRICS_PREFIX),
        Unit::Count,
        "Emails delivered"
    );

    describe_counter!(
        format!("{}_emails_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Emails that could not be delivered"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

pub fn record_feedback_submitted(target_type: &str, rating: &str) {
    counter!(
        format!("{}_feedback_submitted_total", METRICS_PREFIX),
        "target_type" => target_type.to_string(),
        "rating" => rating.to_string()
    )
    .increment(1);
}

/// `to` is the resulting status
pub fn record_feedback_transition(to: &str) {
    counter!(
        format!("{}_feedback_transitions_total", METRICS_PREFIX),
        "to" => to.to_string()
    )
    .increment(1);
}

pub fn record_report_rendered(kind: &str, bytes: usize) {
    counter!(
        format!("{}_reports_rendered_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(1);

    histogram!(format!("{}_report_size_bytes", METRICS_PREFIX)).record(bytes as f64);
}

pub fn record_email(transport: &str, success: bool) {
    let name = if success {
        format!("{}_emails_sent_total", METRICS_PREFIX)
    } else {
        format!("{}_emails_failed_total", METRICS_PREFIX)
    };

    counter!(name, "transport" => transport.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        register_metrics();
        let metrics = RequestMetrics::start("GET", "/feedback/");
        metrics.finish(200);
        record_feedback_submitted("text_analysis", "thumbs_up");
        record_feedback_transition("reviewed");
        record_report_rendered("Text analysis", 1024);
        record_email("log", true);
        record_email("http", false);
    }
}
