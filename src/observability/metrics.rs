//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fetch_requests_total` (counter): fetches by outcome and recovery flag
//! - `fetch_attempt_duration_seconds` (histogram): per-attempt latency by strategy
//! - `fetch_strategy_attempts_total` (counter): attempts by strategy and result
//! - `fetch_circuit_rejections_total` (counter): fetches rejected by an open circuit
//! - `fetch_exhaustions_total` (counter): walks where every strategy failed
//!
//! # Design Decisions
//! - Labels stay low-cardinality (strategy names, outcome kinds); origins
//!   are never used as labels
//! - Recording is a no-op until an exporter is installed, so tests and the
//!   CLI pay nothing

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own address. Call once at
/// startup, inside the runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "metrics exporter started");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start metrics exporter");
        }
    }
}

fn describe_metrics() {
    describe_counter!(
        "fetch_requests_total",
        "Completed fetch requests by outcome and recovery flag"
    );
    describe_histogram!(
        "fetch_attempt_duration_seconds",
        "Latency of individual profile attempts"
    );
    describe_counter!(
        "fetch_strategy_attempts_total",
        "Recovery strategy attempts by strategy and result"
    );
    describe_counter!(
        "fetch_circuit_rejections_total",
        "Fetches rejected without network I/O by an open circuit"
    );
    describe_counter!(
        "fetch_exhaustions_total",
        "Recovery walks where every strategy failed"
    );
}

pub fn record_fetch(outcome: &str, recovered: bool) {
    counter!(
        "fetch_requests_total",
        "outcome" => outcome.to_string(),
        "recovered" => if recovered { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_attempt_duration(strategy: &'static str, elapsed: Duration) {
    histogram!("fetch_attempt_duration_seconds", "strategy" => strategy)
        .record(elapsed.as_secs_f64());
}

pub fn record_strategy(strategy: &'static str, result: &'static str) {
    counter!(
        "fetch_strategy_attempts_total",
        "strategy" => strategy,
        "result" => result
    )
    .increment(1);
}

pub fn record_circuit_rejection() {
    counter!("fetch_circuit_rejections_total").increment(1);
}

pub fn record_exhaustion() {
    counter!("fetch_exhaustions_total").increment(1);
}
