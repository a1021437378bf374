//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// HTTP client for the upstream feeds.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Telegram chat transport (commands in, replies and broadcasts out).
pub mod telegram;

/// Logging and OpenTelemetry tracing integration.
pub mod telemetry;
