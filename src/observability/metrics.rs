//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, method, status
//! - `gateway_request_duration_seconds` (histogram): dispatch latency by route
//! - `gateway_unmatched_total` (counter): requests no route accepted
//! - `gateway_forward_failures_total` (counter): failed forwards by route, cause
//! - `gateway_route_reloads_total` (counter): reloads by result
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; nothing is recorded until
//!   a recorder is installed
//! - Route ids are the only unbounded label and come from configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape endpoint.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(route: &str, method: &str, status: u16, start: Instant) {
    let labels = [
        ("route", route.to_string()),
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!("gateway_requests_total", &labels).increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_unmatched(method: &str) {
    ::metrics::counter!("gateway_unmatched_total", "method" => method.to_string()).increment(1);
}

pub fn record_forward_failure(route: &str, cause: &'static str) {
    ::metrics::counter!(
        "gateway_forward_failures_total",
        "route" => route.to_string(),
        "cause" => cause
    )
    .increment(1);
}

pub fn record_route_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    ::metrics::counter!("gateway_route_reloads_total", "result" => result).increment(1);
}
