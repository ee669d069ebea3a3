//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): front-door latency
//! - `gateway_upstream_errors_total` (counter): failures by kind
//! - `gateway_mapping_entries` (gauge): prefixes in the current table
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; with no exporter
//!   installed the calls are no-ops
//! - Prometheus exporter is optional and bound to its own address

use std::net::SocketAddr;
use std::time::Duration;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed gateway call.
pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds").record(elapsed.as_secs_f64());
}

/// Record a proxying failure by kind (unreachable, timeout, mid_stream, ...).
pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("gateway_upstream_errors_total", "kind" => kind).increment(1);
}

pub fn record_mapping_entries(count: usize) {
    metrics::gauge!("gateway_mapping_entries").set(count as f64);
}
