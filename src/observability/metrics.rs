//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by route, status, cache disposition
//! - `edge_request_duration_seconds` (histogram): end-to-end latency by route
//! - `edge_upstream_attempts_total` (counter): upstream attempts by backend
//! - `edge_coalesced_requests_total` (counter): requests that joined an in-flight fetch
//! - `edge_inflight_keys` (gauge): keys currently being fetched
//! - `edge_proxy_errors_total` (counter): proxy-originated failures by kind
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are low-cardinality (route kind, backend, status)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(route: &str, status: u16, cache: &str, start: Instant) {
    counter!(
        "edge_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string(),
        "cache" => cache.to_string()
    )
    .increment(1);
    histogram!("edge_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_attempts(backend: &str, attempts: u32) {
    counter!("edge_upstream_attempts_total", "backend" => backend.to_string())
        .increment(u64::from(attempts));
}

pub fn record_coalesced(route: &str) {
    counter!("edge_coalesced_requests_total", "route" => route.to_string()).increment(1);
}

pub fn record_inflight(keys: usize) {
    gauge!("edge_inflight_keys").set(keys as f64);
}

pub fn record_proxy_error(kind: &'static str) {
    counter!("edge_proxy_errors_total", "kind" => kind).increment(1);
}
