//! Metrics collection.
//!
//! # Metrics
//! - `threat_ledger_submissions_total` (counter): pipeline submissions by operation, outcome
//! - `threat_ledger_confirmation_seconds` (histogram): submit → inclusion latency
//! - `threat_ledger_node_connected` (gauge): 1=reachable, 0=unreachable
//! - `threat_ledger_reports_total` (counter): report outcomes (recorded, duplicate, failed)
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; installing an exporter is left
//!   to the hosting process, and without one every call is a no-op

use metrics::{counter, gauge, histogram};

/// Record the outcome of one pipeline submission.
pub fn record_submission(operation: &'static str, outcome: &'static str) {
    counter!(
        "threat_ledger_submissions_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record how long a transaction took to be included.
pub fn record_confirmation_latency(operation: &'static str, seconds: f64) {
    histogram!("threat_ledger_confirmation_seconds", "operation" => operation).record(seconds);
}

/// Record the latest liveness probe result.
pub fn record_node_connected(connected: bool) {
    gauge!("threat_ledger_node_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Record a report outcome as seen by callers.
pub fn record_report(outcome: &'static str) {
    counter!("threat_ledger_reports_total", "outcome" => outcome).increment(1);
}
