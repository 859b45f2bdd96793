//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, path, status
//! - `http_requests_duration_seconds` (histogram): latency distribution
//! - `lifecycle_transitions_total` (counter): service state changes by target state
//! - `drain_outcomes_total` (counter): shutdown results
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - The Prometheus exporter listens on its own address

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::lifecycle::{DrainOutcome, ServiceState};

const EXPONENTIAL_SECONDS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let installed = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(EXPONENTIAL_SECONDS)
        .and_then(|builder| builder.install());

    match installed {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Middleware recording request count and latency.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();

    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        "unmatched".to_owned()
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());

    response
}

pub fn record_transition(to: ServiceState) {
    metrics::counter!("lifecycle_transitions_total", "state" => to.as_str()).increment(1);
}

pub fn record_drain_outcome(outcome: DrainOutcome) {
    metrics::counter!("drain_outcomes_total", "outcome" => outcome.as_str()).increment(1);
}
