//! Metrics collection and exposition.
//!
//! # Metrics
//! - `redirector_requests_total` (counter): answered requests by listener, status
//! - `redirector_reloads_total` (counter): reload attempts by outcome
//! - `redirector_routes` (gauge): entries in the committed table by kind
//!
//! # Design Decisions
//! - Recording is always on; without an installed exporter the calls are no-ops
//! - The Prometheus endpoint is opt-in through `[observability]`

use std::net::SocketAddr;

use axum::http::StatusCode;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const HTTP_LISTENER: &str = "http";
pub const HTTPS_LISTENER: &str = "https";

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

/// Count a request answered by one of the listeners.
pub fn record_request(listener: &'static str, status: StatusCode) {
    metrics::counter!(
        "redirector_requests_total",
        "listener" => listener,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}

/// Count a reload attempt.
pub fn record_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("redirector_reloads_total", "outcome" => outcome).increment(1);
}

/// Publish the size of the committed routing table.
pub fn record_routes(redirects: usize, proxies: usize) {
    metrics::gauge!("redirector_routes", "kind" => "redirect").set(redirects as f64);
    metrics::gauge!("redirector_routes", "kind" => "proxy").set(proxies as f64);
}
