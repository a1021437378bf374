//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `MarketReader`: One fetch + normalize per reading
//! - `QueryService`: On-demand replies for chat commands
//! - `Aggregator`: Combined price and sentiment snapshot
//! - `Broadcaster`: Delivers rendered snapshots
//! - `Scheduler`: Fixed-rate tick loop driving the broadcast job
//! - `CommandRouter`: Maps chat commands to replies

/// Snapshot aggregation across both feeds.
pub mod aggregator;
/// Snapshot delivery to the broadcast destination.
pub mod broadcaster;
/// Slash-command parsing and routing.
pub mod commands;
/// Fetch and normalize single readings.
pub mod market_reader;
/// Reply and broadcast text rendering.
pub mod messages;
/// On-demand price and sentiment replies.
pub mod query;
/// Fixed-rate tick loop.
pub mod scheduler;

pub use aggregator::Aggregator;
pub use broadcaster::{BroadcastError, Broadcaster};
pub use commands::{Command, CommandRouter};
pub use market_reader::MarketReader;
pub use query::QueryService;
pub use scheduler::{
    BroadcastJob, ScheduleSettings, Scheduler, SchedulerSnapshot, SchedulerState, SchedulerStats,
    TickError, TickJob,
};
