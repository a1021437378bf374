//! Telegram Chat Transport
//!
//! Bot API client, command poller and polling backoff.

/// Exponential backoff between failed polls.
pub mod backoff;
/// Bot API client and broadcast sink.
pub mod client;
/// Long-poll command loop.
pub mod poller;

pub use backoff::{Backoff, BackoffConfig};
pub use client::{TelegramClient, TelegramError};
pub use poller::TelegramPoller;
