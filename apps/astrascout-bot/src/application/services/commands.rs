//! Chat Command Routing
//!
//! Parses slash commands and maps each one onto a query or a static reply.

use std::sync::Arc;

use super::messages::{HELP_TEXT, PRICE_USAGE};
use super::query::QueryService;
use crate::infrastructure::metrics::record_command;

/// A recognized chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/price [SYMBOL]`
    Price(Option<String>),
    /// `/sentiment` or `/feargreed`
    Sentiment,
}

impl Command {
    /// Parse message text. Returns `None` for anything that is not a known
    /// command.
    ///
    /// Command names are case-insensitive and may carry a `@botname` suffix.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?.strip_prefix('/')?;
        let name = head.split_once('@').map_or(head, |(name, _)| name);

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "price" => Some(Self::Price(parts.next().map(str::to_string))),
            "sentiment" | "feargreed" => Some(Self::Sentiment),
            _ => None,
        }
    }

    /// Stable label used in metrics and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Price(_) => "price",
            Self::Sentiment => "sentiment",
        }
    }
}

/// Turns inbound message text into reply text.
pub struct CommandRouter {
    query: Arc<QueryService>,
}

impl CommandRouter {
    /// Create a router.
    #[must_use]
    pub const fn new(query: Arc<QueryService>) -> Self {
        Self { query }
    }

    /// Reply for `text`, or `None` when it is not a command.
    pub async fn handle(&self, text: &str) -> Option<String> {
        let command = Command::parse(text)?;
        record_command(command.as_str());
        tracing::info!(command = command.as_str(), "Command received");

        let reply = match command {
            Command::Start | Command::Help => HELP_TEXT.to_string(),
            Command::Price(None) => PRICE_USAGE.to_string(),
            Command::Price(Some(symbol)) => self.query.price(&symbol).await,
            Command::Sentiment => self.query.sentiment().await,
        };
        Some(reply)
    }
}
