//! Prometheus metrics for gateway calls.
//!
//! The gateway records through the `metrics` facade; nothing is collected
//! until a recorder is installed. [`install_prometheus_recorder`] installs
//! the Prometheus exporter and returns a handle for rendering.
//!
//! # Example
//!
//! ```rust,no_run
//! use courier_gateway::metrics::install_prometheus_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_prometheus_recorder()?;
//! // ... issue calls ...
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Calls issued through a gateway.
pub const CALLS_TOTAL: &str = "courier_gateway_calls_total";
/// Calls that ended in a transport fault.
pub const CALLS_FAILED_TOTAL: &str = "courier_gateway_calls_failed_total";
/// Rotating-authorization tokens captured from responses.
pub const TOKEN_ROTATIONS_TOTAL: &str = "courier_gateway_token_rotations_total";
/// Broadcast actions posted to the server.
pub const BROADCASTS_TOTAL: &str = "courier_gateway_broadcasts_total";
/// Time from spinner start to spinner end.
pub const CALL_DURATION_SECONDS: &str = "courier_gateway_call_duration_seconds";

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Register descriptions for every gateway metric.
pub fn describe_metrics() {
    describe_counter!(CALLS_TOTAL, "Total number of calls issued through the gateway");
    describe_counter!(
        CALLS_FAILED_TOTAL,
        "Total number of calls that ended in a transport fault"
    );
    describe_counter!(
        TOKEN_ROTATIONS_TOTAL,
        "Total number of rotating authorization tokens captured"
    );
    describe_counter!(BROADCASTS_TOTAL, "Total number of broadcast actions posted");
    describe_histogram!(CALL_DURATION_SECONDS, "Time taken by gateway calls");
}

/// Install the Prometheus recorder and describe all gateway metrics.
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the histogram buckets are rejected,
/// or [`MetricsError::Install`] if a recorder is already installed.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    describe_metrics();
    tracing::debug!("Prometheus recorder installed");
    Ok(handle)
}
