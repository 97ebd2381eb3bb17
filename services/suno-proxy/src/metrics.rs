//! Prometheus metrics exposition
//!
//! Registers and exposes:
//!
//! - `relay_requests_total` (counter): labels `status`, `method`
//! - `relay_request_duration_seconds` (histogram): label `status`
//! - `relay_upstream_errors_total` (counter): label `error_type`
//! - `relay_account_rotations_total` (counter): emitted by the pool
//! - `relay_token_refresh_total` (counter, label `outcome`): emitted by
//!   the background refresher

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Explicit buckets make `relay_request_duration_seconds` render as a real
/// histogram (`_bucket` lines usable from `histogram_quantile()`) instead of
/// the exporter's default summary. Boundaries run from 5ms out to 60s, the
/// top of the configurable upstream timeout range.
///
/// The returned handle renders the text exposition format served on
/// `/metrics`.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "relay_request_duration_seconds".to_string(),
            ),
            &[
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
            ],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record one finished relay request, labeled by status code and method.
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("relay_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "status" => status_str)
        .record(duration_secs);
}

/// Record an upstream error with a classification label.
pub fn record_upstream_error(error_type: &str) {
    metrics::counter!("relay_upstream_errors_total", "error_type" => error_type.to_string())
        .increment(1);
}

/// Runtime counters tracked while the service is running
#[derive(Debug, Clone)]
pub struct RuntimeCounters {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    /// Number of requests currently being processed. Used for drain
    /// coordination: on shutdown, the service waits until this reaches 0
    /// (or the drain deadline expires) before exiting.
    pub in_flight: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl RuntimeCounters {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}
