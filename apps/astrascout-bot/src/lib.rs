#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! AstraScout Bot - Market Pulse Agent
//!
//! A chat bot that answers price and market-sentiment queries on demand
//! and broadcasts a combined snapshot on a fixed schedule. Both upstream
//! feeds are plain JSON-over-HTTP endpoints with unstable field names.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Market readings and normalization rules
//!   - `error`: Failure taxonomy shared by all layers
//!   - `market`: Quotes, sentiment readings, snapshots
//!   - `normalize`: Ordered-candidate JSON field resolution
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Upstream fetch and broadcast delivery interfaces
//!   - `services`: Queries, aggregation, broadcasting, scheduling, commands
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `http`: `reqwest` upstream client
//!   - `telegram`: Bot API client, command poller
//!   - `config`: Environment configuration
//!   - `health`: Health check HTTP endpoint
//!   - `metrics` / `telemetry`: Observability
//!
//! # Data Flow
//!
//! ```text
//! /price, /sentiment ──► CommandRouter ──► QueryService ──┐
//!                                                          ├──► MarketReader ──► UpstreamPort
//! Scheduler tick ──► Aggregator ─────────────────────────┘         │
//!        │                                                  ResponseNormalizer
//!        └──► Broadcaster ──► BroadcastSink
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Market types and pure normalization.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::error::ErrorKind;
pub use domain::market::{
    AggregateSnapshot, NormalizedQuote, NormalizedSentiment, Source, SourceError, Symbol,
    SymbolError,
};
pub use domain::normalize::{FieldCandidates, NormalizerFields, ResponseNormalizer};

// Ports
pub use application::ports::{
    AuthHeader, BroadcastSink, DeliveryError, Endpoint, UpstreamError, UpstreamPort,
    UpstreamRequest, UpstreamResult,
};

// Services
pub use application::services::{
    Aggregator, BroadcastError, BroadcastJob, Broadcaster, Command, CommandRouter, MarketReader,
    QueryService, ScheduleSettings, Scheduler, SchedulerState, SchedulerStats, TickError, TickJob,
};

// Infrastructure config
pub use infrastructure::config::{
    BotConfig, ConfigError, Credentials, PollingSettings, ServerSettings,
};

// Adapters
pub use infrastructure::http::HttpUpstreamClient;
pub use infrastructure::telegram::{BackoffConfig, TelegramClient, TelegramError, TelegramPoller};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
