//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (upstream feeds, chat delivery).
pub mod ports;

/// Application services for queries, aggregation and scheduled broadcasts.
pub mod services;
