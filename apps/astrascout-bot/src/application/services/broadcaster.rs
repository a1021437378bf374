//! Broadcaster
//!
//! Renders a snapshot and hands it to the broadcast sink. Delivery
//! failures are reported to the caller for logging, never to chat users.

use std::sync::Arc;

use thiserror::Error;

use super::messages::render_snapshot;
use crate::application::ports::{BroadcastSink, DeliveryError};
use crate::domain::error::ErrorKind;
use crate::domain::market::AggregateSnapshot;
use crate::infrastructure::metrics::{BroadcastOutcome, record_broadcast};

/// Broadcast failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// No destination configured; the broadcast was skipped.
    #[error("broadcast destination not configured")]
    Unconfigured,

    /// The sink rejected the message.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl BroadcastError {
    /// Taxonomy kind for this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unconfigured => ErrorKind::Unconfigured,
            Self::Delivery(_) => ErrorKind::Transport,
        }
    }
}

/// Sends one message per snapshot to a fixed destination.
pub struct Broadcaster {
    sink: Arc<dyn BroadcastSink>,
    destination: Option<String>,
}

impl Broadcaster {
    /// Create a broadcaster. `None` disables delivery.
    #[must_use]
    pub fn new(sink: Arc<dyn BroadcastSink>, destination: Option<String>) -> Self {
        Self { sink, destination }
    }

    /// Whether a destination is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.destination.is_some()
    }

    /// Render and deliver `snapshot`.
    ///
    /// Empty snapshots are still delivered with a no-data notice.
    ///
    /// # Errors
    ///
    /// `Unconfigured` when no destination is set; `Delivery` when the sink
    /// fails.
    pub async fn broadcast(&self, snapshot: &AggregateSnapshot) -> Result<(), BroadcastError> {
        let Some(destination) = self.destination.as_deref() else {
            tracing::info!("No broadcast destination configured, skipping");
            record_broadcast(BroadcastOutcome::Skipped);
            return Err(BroadcastError::Unconfigured);
        };

        let text = render_snapshot(snapshot);
        match self.sink.send(destination, &text).await {
            Ok(()) => {
                record_broadcast(BroadcastOutcome::Delivered);
                tracing::info!(
                    destination,
                    missing = snapshot.errors().len(),
                    "Broadcast delivered"
                );
                Ok(())
            }
            Err(err) => {
                record_broadcast(BroadcastOutcome::Failed);
                tracing::warn!(destination, error = %err, "Broadcast delivery failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::application::ports::MockBroadcastSink;
    use crate::domain::market::NormalizedSentiment;

    fn partial_snapshot() -> AggregateSnapshot {
        AggregateSnapshot::from_outcomes(
            Err(ErrorKind::Timeout),
            Ok(NormalizedSentiment {
                score: Decimal::from(22),
                label: "Extreme Fear".to_string(),
            }),
        )
    }

    #[tokio::test]
    async fn sends_partial_snapshot_to_destination() {
        let mut sink = MockBroadcastSink::new();
        sink.expect_send()
            .withf(|dest, text| {
                dest == "-100123"
                    && text.contains("Extreme Fear")
                    && text.contains("Price: unavailable")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let broadcaster = Broadcaster::new(Arc::new(sink), Some("-100123".to_string()));
        assert!(broadcaster.broadcast(&partial_snapshot()).await.is_ok());
    }

    #[tokio::test]
    async fn empty_snapshot_is_still_sent() {
        let mut sink = MockBroadcastSink::new();
        sink.expect_send().times(1).returning(|_, _| Ok(()));

        let snapshot =
            AggregateSnapshot::from_outcomes(Err(ErrorKind::Timeout), Err(ErrorKind::Timeout));
        let broadcaster = Broadcaster::new(Arc::new(sink), Some("42".to_string()));
        assert!(broadcaster.broadcast(&snapshot).await.is_ok());
    }

    #[tokio::test]
    async fn missing_destination_skips_sink() {
        let mut sink = MockBroadcastSink::new();
        sink.expect_send().never();

        let broadcaster = Broadcaster::new(Arc::new(sink), None);
        assert!(!broadcaster.is_enabled());
        let err = broadcaster.broadcast(&partial_snapshot()).await.unwrap_err();
        assert_eq!(err, BroadcastError::Unconfigured);
        assert_eq!(err.kind(), ErrorKind::Unconfigured);
    }

    #[tokio::test]
    async fn delivery_failure_is_returned() {
        let mut sink = MockBroadcastSink::new();
        sink.expect_send()
            .returning(|_, _| Err(DeliveryError("chat not found".to_string())));

        let broadcaster = Broadcaster::new(Arc::new(sink), Some("42".to_string()));
        let err = broadcaster.broadcast(&partial_snapshot()).await.unwrap_err();
        assert!(matches!(err, BroadcastError::Delivery(_)));
    }
}
