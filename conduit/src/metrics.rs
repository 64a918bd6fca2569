//! Transport observability metrics
//!
//! Provides Prometheus-compatible metrics for:
//! - Session lifecycle (opened/closed, active gauge)
//! - JSON-RPC dispatch by method and outcome
//! - Tool invocation latency
//! - Replies dropped because their session vanished

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub const SESSIONS_OPENED_TOTAL: &str = "conduit_sessions_opened_total";
pub const SESSIONS_CLOSED_TOTAL: &str = "conduit_sessions_closed_total";
pub const SESSIONS_ACTIVE: &str = "conduit_sessions_active";
pub const RPC_REQUESTS_TOTAL: &str = "conduit_rpc_requests_total";
pub const TOOL_DURATION_SECONDS: &str = "conduit_tool_duration_seconds";
pub const DELIVERIES_DROPPED_TOTAL: &str = "conduit_deliveries_dropped_total";

/// Install the global Prometheus recorder and return the render handle.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Record a newly registered session
pub fn record_session_opened(active: usize) {
    metrics::counter!(SESSIONS_OPENED_TOTAL).increment(1);
    metrics::gauge!(SESSIONS_ACTIVE).set(active as f64);
}

/// Record a torn down session
pub fn record_session_closed(active: usize) {
    metrics::counter!(SESSIONS_CLOSED_TOTAL).increment(1);
    metrics::gauge!(SESSIONS_ACTIVE).set(active as f64);
}

/// Record a dispatched JSON-RPC message
pub fn record_rpc(method: &str, status: &'static str) {
    metrics::counter!(
        RPC_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status,
    )
    .increment(1);
}

/// Record how long the tool collaborator took
pub fn record_tool_duration(tool: &str, duration: Duration) {
    metrics::histogram!(
        TOOL_DURATION_SECONDS,
        "tool" => tool.to_string(),
    )
    .record(duration.as_secs_f64());
}

pub fn record_delivery_dropped() {
    metrics::counter!(DELIVERIES_DROPPED_TOTAL).increment(1);
}
