//! Metrics definitions for the draft service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `draft_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code:
//! - `outcome`: accepted, skipped, draft_complete, already_taken, wrong_turn
//! - `operation`: read, write, delete, list, flush
//! - `actor_type`: controller, room, connection

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Redis round trips are expected well under 10ms
        .set_buckets_for_metric(
            Matcher::Prefix("draft_repository".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set repository buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Set the number of live room actors.
///
/// Metric: `draft_rooms_active`
pub fn set_rooms_active(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("draft_rooms_active").set(count as f64);
}

/// Set the number of open realtime connections.
///
/// Metric: `draft_connections_active`
pub fn set_connections_active(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("draft_connections_active").set(count as f64);
}

/// Record the outcome of one action, skip or auto-resolution.
///
/// Metric: `draft_actions_total`
/// Labels: `outcome`
pub fn record_action(outcome: &'static str) {
    counter!("draft_actions_total", "outcome" => outcome).increment(1);
}

/// Record a failed repository call.
///
/// Metric: `draft_storage_failures_total`
/// Labels: `operation`
pub fn record_storage_failure(operation: &'static str) {
    counter!("draft_storage_failures_total", "operation" => operation).increment(1);
}

/// Metric: `draft_actor_panics_total`
/// Labels: `actor_type`
pub fn record_actor_panic(actor_type: &'static str) {
    counter!("draft_actor_panics_total", "actor_type" => actor_type).increment(1);
}

/// Record an approved restart.
///
/// Metric: `draft_restarts_total`
pub fn record_restart() {
    counter!("draft_restarts_total").increment(1);
}

/// Record repository call latency.
///
/// Metric: `draft_repository_latency_seconds`
/// Labels: `operation`
pub fn record_repository_latency(operation: &'static str, duration: Duration) {
    histogram!("draft_repository_latency_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}
