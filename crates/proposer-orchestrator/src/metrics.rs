//! Prometheus metrics for the orchestrator tick loop.
//!
//! Modeled on `zkboost-server`'s `metrics.rs`: a single `init_metrics` call registers
//! descriptions up front, and small `record_*`/`set_*` helpers are sprinkled at the
//! call sites that actually observe something (§2.1 A5).

use std::time::Duration;

use metrics::{describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    describe_gauge!("proposer_ledger_records", "Number of proof requests by status");
    describe_histogram!("proposer_derivation_duration_seconds", "Span-range derivation wall time");
    describe_histogram!("proposer_prover_request_duration_seconds", "Prover round-trip time by operation");
    describe_histogram!("proposer_tick_duration_seconds", "Orchestrator tick wall time");

    handle
}

pub fn record_ledger_status_count(status: &str, count: u64) {
    gauge!("proposer_ledger_records", "status" => status.to_string()).set(count as f64);
}

pub fn record_derivation_duration(duration: Duration) {
    histogram!("proposer_derivation_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_prover_request_duration(operation: &'static str, duration: Duration) {
    histogram!("proposer_prover_request_duration_seconds", "operation" => operation).record(duration.as_secs_f64());
}

pub fn record_tick_duration(duration: Duration) {
    histogram!("proposer_tick_duration_seconds").record(duration.as_secs_f64());
}
