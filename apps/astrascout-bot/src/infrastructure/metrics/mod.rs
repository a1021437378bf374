//! Prometheus Metrics Module
//!
//! Exposes bot metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Upstream**: Request counts by source and outcome, request latency
//! - **Scheduler**: Tick outcomes
//! - **Broadcast**: Delivery outcomes
//! - **Commands**: Chat commands handled
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! functions are no-ops until [`init_metrics`] installs the recorder.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::market::Source;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the already installed handle.
///
/// # Errors
///
/// Returns an error if the global recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "astrascout_upstream_requests_total",
        "Total upstream requests by source and outcome"
    );
    describe_histogram!(
        "astrascout_upstream_request_seconds",
        "Upstream request latency"
    );

    describe_counter!(
        "astrascout_ticks_total",
        "Total scheduler ticks by outcome"
    );

    describe_counter!(
        "astrascout_broadcasts_total",
        "Total broadcast attempts by outcome"
    );

    describe_counter!(
        "astrascout_commands_total",
        "Total chat commands handled"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for a scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Snapshot collected and handed to the broadcaster.
    Completed,
    /// The tick returned an error.
    Failed,
    /// The tick task panicked or was aborted.
    Panicked,
}

impl TickOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Panicked => "panicked",
        }
    }
}

/// Outcome label for a broadcast attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Message accepted by the sink.
    Delivered,
    /// No destination configured.
    Skipped,
    /// The sink rejected the message.
    Failed,
}

impl BroadcastOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Record one upstream request. `outcome` is `"ok"` or an error label.
pub fn record_upstream_request(source: Source, outcome: &'static str, elapsed: Duration) {
    counter!(
        "astrascout_upstream_requests_total",
        "source" => source.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "astrascout_upstream_request_seconds",
        "source" => source.as_str()
    )
    .record(elapsed.as_secs_f64());
}

/// Record a finished scheduler tick.
pub fn record_tick(outcome: TickOutcome) {
    counter!("astrascout_ticks_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a broadcast attempt.
pub fn record_broadcast(outcome: BroadcastOutcome) {
    counter!("astrascout_broadcasts_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a handled chat command.
pub fn record_command(command: &'static str) {
    counter!("astrascout_commands_total", "command" => command).increment(1);
}

// =============================================================================
// Tests
// =============================================================================
