//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balancer_requests_total` (counter): requests by method, status, backend
//! - `balancer_request_duration_seconds` (histogram): latency distribution
//! - `balancer_backend_alive` (gauge): 1=alive, 0=dead
//! - `balancer_retries_total` (counter): retries by failed backend
//! - `balancer_no_backend_total` (counter): requests refused with 503
//!
//! Recorders are no-ops until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a finished request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    counter!(
        "balancer_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);
    histogram!(
        "balancer_request_duration_seconds",
        "method" => method.to_string(),
        "backend" => backend.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(backend: &str, alive: bool) {
    gauge!("balancer_backend_alive", "backend" => backend.to_string())
        .set(if alive { 1.0 } else { 0.0 });
}

pub fn record_retry(backend: &str) {
    counter!("balancer_retries_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_no_backend() {
    counter!("balancer_no_backend_total").increment(1);
}
