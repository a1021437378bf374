//! Health and Metrics Endpoint
//!
//! Small `axum` server exposing scheduler liveness for orchestrators and the
//! Prometheus scrape target.
//!
//! # Endpoints
//!
//! - `GET /health` - JSON report; 503 until the scheduler loop has started
//! - `GET /healthz` - Liveness check (plain `OK`)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::{SchedulerSnapshot, SchedulerState, SchedulerStats};
use crate::infrastructure::metrics::get_metrics_handle;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

// =============================================================================
// Report
// =============================================================================

/// Bot health as derived from the broadcast scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Loop running and at least one tick has succeeded (or none finished yet).
    Healthy,
    /// Loop running but every finished tick has failed.
    Degraded,
    /// Loop not started.
    Unhealthy,
}

impl HealthStatus {
    /// Classify a scheduler snapshot.
    #[must_use]
    pub const fn from_scheduler(snapshot: &SchedulerSnapshot) -> Self {
        match snapshot.state {
            SchedulerState::Idle => Self::Unhealthy,
            SchedulerState::Running
                if snapshot.ticks_failed > 0 && snapshot.ticks_completed == 0 =>
            {
                Self::Degraded
            }
            SchedulerState::Running => Self::Healthy,
        }
    }

    const fn http_status(self) -> StatusCode {
        match self {
            Self::Healthy | Self::Degraded => StatusCode::OK,
            Self::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// Crate version.
    pub version: String,
    /// Seconds since the health state was created.
    pub uptime_secs: u64,
    /// Time the report was produced.
    pub current_time: DateTime<Utc>,
    /// Broadcast scheduler counters.
    pub scheduler: SchedulerSnapshot,
    /// Whether a broadcast destination is configured.
    pub broadcast_enabled: bool,
}

/// State shared by the handlers.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    scheduler: Arc<SchedulerStats>,
    broadcast_enabled: bool,
}

impl HealthServerState {
    /// Create handler state.
    #[must_use]
    pub fn new(version: String, scheduler: Arc<SchedulerStats>, broadcast_enabled: bool) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            scheduler,
            broadcast_enabled,
        }
    }

    /// Build a report from the current counters.
    #[must_use]
    pub fn report(&self) -> HealthReport {
        let scheduler = self.scheduler.snapshot();
        HealthReport {
            status: HealthStatus::from_scheduler(&scheduler),
            version: self.version.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            current_time: Utc::now(),
            scheduler,
            broadcast_enabled: self.broadcast_enabled,
        }
    }
}

// =============================================================================
// Server
// =============================================================================

/// Health server error.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// The listener could not be bound.
    #[error("failed to bind health port {port}")]
    Bind {
        /// Requested port.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("health server failed")]
    Serve(#[source] std::io::Error),
}

/// Health HTTP server bound to `0.0.0.0:{port}`.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a server; nothing is bound until [`run`](Self::run).
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Serve until the cancellation token fires.
    ///
    /// # Errors
    ///
    /// Returns `Bind` if the port is unavailable and `Serve` if the server
    /// stops with an I/O error.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let port = self.port;
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port)))
            .await
            .map_err(|source| HealthServerError::Bind { port, source })?;
        tracing::info!(port, "Health server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(HealthServerError::Serve)?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

/// Routes served by [`HealthServer`].
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(|| async { "OK" }))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn health(State(state): State<Arc<HealthServerState>>) -> Response {
    let report = state.report();
    (report.status.http_status(), axum::Json(report)).into_response()
}

async fn metrics() -> Response {
    match get_metrics_handle() {
        Some(handle) => (
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
