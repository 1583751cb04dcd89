//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rewrite_requests_total` (counter): requests by outcome
//!   (`declined`, `passthrough`, `rewritten`, `short_circuit`, `failed`)
//! - `rewrite_rules_loaded` (gauge): top-level rules in the live container

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// How the rewrite stage disposed of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    Declined,
    Passthrough,
    Rewritten,
    ShortCircuit,
    Failed,
}

impl RewriteOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RewriteOutcome::Declined => "declined",
            RewriteOutcome::Passthrough => "passthrough",
            RewriteOutcome::Rewritten => "rewritten",
            RewriteOutcome::ShortCircuit => "short_circuit",
            RewriteOutcome::Failed => "failed",
        }
    }
}

/// Start the Prometheus scrape endpoint. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_outcome(outcome: RewriteOutcome) {
    ::metrics::counter!("rewrite_requests_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_rules_loaded(count: usize) {
    ::metrics::gauge!("rewrite_rules_loaded").set(count as f64);
}
