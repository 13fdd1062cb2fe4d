//! Prometheus metrics
//!
//! The agent crates record through the `metrics` facade; this module
//! installs the Prometheus recorder and describes every series once.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::ServerError;

/// Install the global Prometheus recorder
///
/// Only one recorder can be installed per process.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("failed to install Prometheus recorder: {e}")))?;

    register_metrics();
    Ok(handle)
}

/// Describe the receptionist series
pub fn register_metrics() {
    describe_counter!("receptionist_calls_started_total", "Calls that reached the active state");
    describe_counter!("receptionist_calls_finalized_total", "Calls finalized");
    describe_histogram!(
        "receptionist_call_duration_seconds",
        "Call duration from connect to teardown in seconds"
    );
    describe_counter!("receptionist_turns_total", "Receptionist turns started");
    describe_counter!("receptionist_barge_ins_total", "Turns interrupted by the caller");
    describe_counter!(
        "receptionist_tool_calls_total",
        "Tool dispatches by tool and outcome"
    );
    describe_counter!(
        "receptionist_call_records_persisted_total",
        "Call record persistence attempts by outcome"
    );
    describe_gauge!("receptionist_active_sessions", "Currently open calls");
}

/// Set the number of open calls
pub fn set_active_sessions(count: usize) {
    metrics::gauge!("receptionist_active_sessions").set(count as f64);
}
