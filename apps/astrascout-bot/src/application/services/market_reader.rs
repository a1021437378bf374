//! Market Reader
//!
//! One upstream call plus normalization per reading. Shared by the query
//! path and the scheduled aggregation path.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::application::ports::{Endpoint, UpstreamPort, UpstreamRequest};
use crate::domain::error::ErrorKind;
use crate::domain::market::{NormalizedQuote, NormalizedSentiment, Symbol};
use crate::domain::normalize::ResponseNormalizer;
use crate::infrastructure::metrics::record_upstream_request;

/// Fetches and normalizes price and sentiment readings.
pub struct MarketReader {
    upstream: Arc<dyn UpstreamPort>,
    price: Endpoint,
    sentiment: Endpoint,
    normalizer: ResponseNormalizer,
}

impl MarketReader {
    /// Create a reader over the given endpoints.
    #[must_use]
    pub fn new(
        upstream: Arc<dyn UpstreamPort>,
        price: Endpoint,
        sentiment: Endpoint,
        normalizer: ResponseNormalizer,
    ) -> Self {
        Self {
            upstream,
            price,
            sentiment,
            normalizer,
        }
    }

    /// Fetch the current price for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns the transport or normalization failure kind.
    pub async fn quote(&self, symbol: &Symbol) -> Result<NormalizedQuote, ErrorKind> {
        let body = self.fetch(self.price.request_for(symbol.as_str())).await?;
        self.normalizer
            .normalize_price(&body, symbol)
            .inspect_err(|kind| {
                tracing::warn!(symbol = %symbol, error = %kind, "Price payload rejected");
            })
    }

    /// Fetch the current sentiment reading.
    ///
    /// # Errors
    ///
    /// Returns the transport or normalization failure kind.
    pub async fn sentiment(&self) -> Result<NormalizedSentiment, ErrorKind> {
        let body = self.fetch(self.sentiment.request()).await?;
        self.normalizer
            .normalize_sentiment(&body)
            .inspect_err(|kind| {
                tracing::warn!(error = %kind, "Sentiment payload rejected");
            })
    }

    async fn fetch(&self, request: UpstreamRequest) -> Result<Value, ErrorKind> {
        let started = Instant::now();
        let result = self.upstream.fetch(&request).await;
        let elapsed = started.elapsed();

        match result {
            Ok(body) => {
                record_upstream_request(request.source(), "ok", elapsed);
                tracing::debug!(
                    source = %request.source(),
                    url = request.url(),
                    elapsed_ms = elapsed.as_millis(),
                    "Upstream request succeeded"
                );
                Ok(body)
            }
            Err(err) => {
                record_upstream_request(request.source(), err.kind.as_str(), elapsed);
                tracing::warn!(
                    source = %request.source(),
                    url = request.url(),
                    error = %err.kind,
                    detail = %err.detail,
                    "Upstream request failed"
                );
                Err(err.kind)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::always;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::application::ports::{MockUpstreamPort, UpstreamError};
    use crate::domain::market::Source;

    fn reader(mock: MockUpstreamPort) -> MarketReader {
        MarketReader::new(
            Arc::new(mock),
            Endpoint::new(Source::Price, "https://price.test"),
            Endpoint::new(Source::Sentiment, "https://insights.test/fng"),
            ResponseNormalizer::default(),
        )
    }

    #[tokio::test]
    async fn quote_requests_symbol_path() {
        let mut mock = MockUpstreamPort::new();
        mock.expect_fetch()
            .withf(|req| req.url() == "https://price.test/ETH" && req.source() == Source::Price)
            .times(1)
            .returning(|_| Ok(json!({"price": "3100.5"})));

        let quote = reader(mock)
            .quote(&Symbol::parse("eth").unwrap())
            .await
            .unwrap();
        assert_eq!(quote.value, Decimal::new(31005, 1));
    }

    #[tokio::test]
    async fn transport_error_kind_is_returned() {
        let mut mock = MockUpstreamPort::new();
        mock.expect_fetch()
            .with(always())
            .returning(|_| Err(UpstreamError::new(ErrorKind::Timeout, "slow")));

        let err = reader(mock).sentiment().await.unwrap_err();
        assert_eq!(err, ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn normalization_error_kind_is_returned() {
        let mut mock = MockUpstreamPort::new();
        mock.expect_fetch()
            .returning(|_| Ok(json!({"fear_greed_index": 50})));

        let err = reader(mock).sentiment().await.unwrap_err();
        assert_eq!(err, ErrorKind::MissingField);
    }
}
