//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_forward_total` (counter): forwarded exchanges by method,
//!   status, tenant
//! - `gateway_forward_duration_seconds` (histogram): forward latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}

/// Record one forwarded exchange.
pub fn record_forward(method: &str, status: u16, tenant: &str, start: Instant) {
    metrics::counter!(
        "gateway_forward_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "tenant" => tenant.to_string(),
    )
    .increment(1);
    metrics::histogram!(
        "gateway_forward_duration_seconds",
        "method" => method.to_string(),
        "tenant" => tenant.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}
