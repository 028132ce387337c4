//! Metrics collection.
//!
//! # Metrics
//! - `bluzelle_tx_submitted_total` (counter): logical transactions by command
//! - `bluzelle_tx_committed_total` (counter): committed transactions by command
//! - `bluzelle_tx_failed_total` (counter): failures by command, reason
//! - `bluzelle_stale_sequence_retries_total` (counter): resync attempts
//! - `bluzelle_account_refresh_total` (counter): successful account reads
//! - `bluzelle_gateway_health` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the embedding application
//!   installs a recorder, the library never does
//! - Without a recorder every call is a no-op

use metrics::{counter, gauge};

pub fn record_tx_submitted(command: &str) {
    counter!("bluzelle_tx_submitted_total", "command" => command.to_string()).increment(1);
}

pub fn record_tx_committed(command: &str) {
    counter!("bluzelle_tx_committed_total", "command" => command.to_string()).increment(1);
}

pub fn record_tx_failed(command: &str, reason: &'static str) {
    counter!(
        "bluzelle_tx_failed_total",
        "command" => command.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_stale_sequence_retry() {
    counter!("bluzelle_stale_sequence_retries_total").increment(1);
}

pub fn record_account_refresh() {
    counter!("bluzelle_account_refresh_total").increment(1);
}

pub fn record_gateway_health(healthy: bool) {
    gauge!("bluzelle_gateway_health").set(if healthy { 1.0 } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_tx_submitted("create");
        record_tx_committed("create");
        record_tx_failed("create", "execution");
        record_stale_sequence_retry();
        record_account_refresh();
        record_gateway_health(false);
    }
}
