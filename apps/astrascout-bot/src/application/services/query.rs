//! Query Service
//!
//! On-demand price and sentiment lookups for chat commands. Every outcome
//! is rendered to reply text; failures become a short apology.

use std::sync::Arc;

use super::market_reader::MarketReader;
use super::messages;
use crate::domain::market::Symbol;

/// Synchronous request/reply path.
pub struct QueryService {
    reader: Arc<MarketReader>,
}

impl QueryService {
    /// Create a query service.
    #[must_use]
    pub const fn new(reader: Arc<MarketReader>) -> Self {
        Self { reader }
    }

    /// Reply for a price query on user-supplied `raw_symbol`.
    pub async fn price(&self, raw_symbol: &str) -> String {
        let symbol = match Symbol::parse(raw_symbol) {
            Ok(symbol) => symbol,
            Err(err) => return messages::invalid_symbol(&err.to_string()),
        };

        match self.reader.quote(&symbol).await {
            Ok(quote) => messages::quote_line(&quote),
            Err(kind) => {
                tracing::info!(symbol = %symbol, error = %kind, "Price query failed");
                messages::price_apology(symbol.as_str())
            }
        }
    }

    /// Reply for a sentiment query.
    pub async fn sentiment(&self) -> String {
        match self.reader.sentiment().await {
            Ok(sentiment) => messages::sentiment_reply(&sentiment),
            Err(kind) => {
                tracing::info!(error = %kind, "Sentiment query failed");
                messages::sentiment_apology()
            }
        }
    }
}
