//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_decisions_total` (counter): decisions by reason
//! - `gatekeeper_rate_limited_total` (counter): 429s by scope
//! - `gatekeeper_identity_errors_total` (counter): identity failures by kind
//! - `gatekeeper_rate_limit_keys` (gauge): live counters in the store
//! - `gatekeeper_rate_limit_swept_total` (counter): expired counters removed
//! - `gatekeeper_upstream_requests_total` (counter): forwarded requests by status
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(reason: &'static str) {
    counter!("gatekeeper_decisions_total", "reason" => reason).increment(1);
}

pub fn record_rate_limited(scope: &str) {
    counter!("gatekeeper_rate_limited_total", "scope" => scope.to_string()).increment(1);
}

pub fn record_identity_error(kind: &'static str) {
    counter!("gatekeeper_identity_errors_total", "kind" => kind).increment(1);
}

pub fn record_sweep(removed: usize, live_keys: usize) {
    counter!("gatekeeper_rate_limit_swept_total").increment(removed as u64);
    gauge!("gatekeeper_rate_limit_keys").set(live_keys as f64);
}

pub fn record_upstream(status: u16) {
    counter!("gatekeeper_upstream_requests_total", "status" => status.to_string()).increment(1);
}
