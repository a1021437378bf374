//! Aggregator
//!
//! Collects price and sentiment into one snapshot. Each source is isolated:
//! a failure is recorded in the snapshot and never short-circuits the other.

use std::sync::Arc;

use super::market_reader::MarketReader;
use crate::domain::market::{AggregateSnapshot, Symbol};

/// Builds one [`AggregateSnapshot`] per call.
pub struct Aggregator {
    reader: Arc<MarketReader>,
    reference: Symbol,
}

impl Aggregator {
    /// Create an aggregator quoting `reference` on every collection.
    #[must_use]
    pub const fn new(reader: Arc<MarketReader>, reference: Symbol) -> Self {
        Self { reader, reference }
    }

    /// Fetch price, then sentiment. Total: always returns a snapshot.
    pub async fn collect(&self) -> AggregateSnapshot {
        let quote = self.reader.quote(&self.reference).await;
        let sentiment = self.reader.sentiment().await;
        let snapshot = AggregateSnapshot::from_outcomes(quote, sentiment);

        tracing::info!(
            reference = %self.reference,
            has_quote = snapshot.quote().is_some(),
            has_sentiment = snapshot.sentiment().is_some(),
            errors = snapshot.errors().len(),
            "Snapshot collected"
        );
        snapshot
    }
}
