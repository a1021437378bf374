//! Broadcast Scheduler
//!
//! Fires a job after an initial delay and then at a fixed rate. Each tick
//! runs as its own task, so a slow tick never delays the next one and a
//! failing or panicking tick never stops the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::aggregator::Aggregator;
use super::broadcaster::{BroadcastError, Broadcaster};
use crate::domain::error::ErrorKind;
use crate::infrastructure::metrics::{TickOutcome, record_tick};

/// Default delay before the first tick.
pub const DEFAULT_FIRST_DELAY: Duration = Duration::from_secs(10);

/// Default period between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

// =============================================================================
// Configuration
// =============================================================================

/// Timing for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Delay before the first tick.
    pub first_delay: Duration,
    /// Period between tick starts.
    pub interval: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            first_delay: DEFAULT_FIRST_DELAY,
            interval: DEFAULT_INTERVAL,
        }
    }
}

// =============================================================================
// Tick Job
// =============================================================================

/// Error returned by a single tick.
#[derive(Debug, Error)]
pub enum TickError {
    /// The collected snapshot could not be delivered.
    #[error("broadcast failed: {0}")]
    Broadcast(#[from] BroadcastError),
}

/// Work performed on every tick.
#[async_trait]
pub trait TickJob: Send + Sync + 'static {
    /// Run one tick.
    async fn run(&self) -> Result<(), TickError>;
}

/// Collect a snapshot and broadcast it.
pub struct BroadcastJob {
    aggregator: Arc<Aggregator>,
    broadcaster: Arc<Broadcaster>,
}

impl BroadcastJob {
    /// Create a broadcast job.
    #[must_use]
    pub const fn new(aggregator: Arc<Aggregator>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            aggregator,
            broadcaster,
        }
    }
}

#[async_trait]
impl TickJob for BroadcastJob {
    async fn run(&self) -> Result<(), TickError> {
        let snapshot = self.aggregator.collect().await;
        match self.broadcaster.broadcast(&snapshot).await {
            Err(err) if err.kind() == ErrorKind::Unconfigured => Ok(()),
            result => result.map_err(TickError::from),
        }
    }
}

// =============================================================================
// State
// =============================================================================

/// Scheduler lifecycle. There is no transition out of `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Constructed, loop not started.
    Idle,
    /// Loop started.
    Running,
}

/// Counters shared with the health endpoint.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    running: AtomicBool,
    ticks_started: AtomicU64,
    ticks_completed: AtomicU64,
    ticks_failed: AtomicU64,
    last_tick_at: RwLock<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`SchedulerStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerSnapshot {
    /// Lifecycle state.
    pub state: SchedulerState,
    /// Ticks spawned so far.
    pub ticks_started: u64,
    /// Ticks that finished without error.
    pub ticks_completed: u64,
    /// Ticks that returned an error or panicked.
    pub ticks_failed: u64,
    /// Start time of the most recent tick.
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl SchedulerStats {
    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Copy all counters.
    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            state: self.state(),
            ticks_started: self.ticks_started.load(Ordering::Relaxed),
            ticks_completed: self.ticks_completed.load(Ordering::Relaxed),
            ticks_failed: self.ticks_failed.load(Ordering::Relaxed),
            last_tick_at: *self.last_tick_at.read(),
        }
    }

    fn mark_running(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    fn tick_started(&self) {
        self.ticks_started.fetch_add(1, Ordering::Relaxed);
        *self.last_tick_at.write() = Some(Utc::now());
    }

    fn tick_finished(&self, outcome: TickOutcome) {
        match outcome {
            TickOutcome::Completed => self.ticks_completed.fetch_add(1, Ordering::Relaxed),
            TickOutcome::Failed | TickOutcome::Panicked => {
                self.ticks_failed.fetch_add(1, Ordering::Relaxed)
            }
        };
        record_tick(outcome);
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Fixed-rate scheduler for a [`TickJob`].
pub struct Scheduler<J: TickJob> {
    job: Arc<J>,
    settings: ScheduleSettings,
    stats: Arc<SchedulerStats>,
}

impl<J: TickJob> Scheduler<J> {
    /// Create an idle scheduler.
    #[must_use]
    pub fn new(job: J, settings: ScheduleSettings) -> Self {
        Self {
            job: Arc::new(job),
            settings,
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.stats)
    }

    /// Run the tick loop until `cancel` fires.
    ///
    /// In-flight ticks are left to finish on their own.
    pub async fn run(self, cancel: CancellationToken) {
        let Some(start) = Instant::now().checked_add(self.settings.first_delay) else {
            tracing::error!(
                first_delay_secs = self.settings.first_delay.as_secs(),
                "First delay out of range, scheduler not started"
            );
            return;
        };
        self.stats.mark_running();
        tracing::info!(
            first_delay_secs = self.settings.first_delay.as_secs(),
            interval_secs = self.settings.interval.as_secs(),
            "Scheduler started"
        );

        let mut ticker = tokio::time::interval_at(start, self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("Scheduler cancelled");
                    break;
                }
                _ = ticker.tick() => self.spawn_tick(),
            }
        }
    }

    fn spawn_tick(&self) {
        let tick_id = Uuid::new_v4();
        let span = tracing::info_span!("tick", %tick_id);
        self.stats.tick_started();

        let job = Arc::clone(&self.job);
        let stats = Arc::clone(&self.stats);
        let inner_span = span.clone();

        tokio::spawn(
            async move {
                // The job runs in its own task so a panic surfaces as a JoinError here.
                let handle = tokio::spawn(async move { job.run().await }.instrument(inner_span));
                let outcome = match handle.await {
                    Ok(Ok(())) => {
                        tracing::debug!("Tick completed");
                        TickOutcome::Completed
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(error = %err, "Tick failed");
                        TickOutcome::Failed
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "Tick panicked");
                        TickOutcome::Panicked
                    }
                };
                stats.tick_finished(outcome);
            }
            .instrument(span),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;
    use crate::application::ports::{
        DeliveryError, Endpoint, MockBroadcastSink, MockUpstreamPort,
    };
    use crate::application::services::MarketReader;
    use crate::domain::market::{Source, Symbol};
    use crate::domain::normalize::ResponseNormalizer;

    fn broadcast_job(sink: MockBroadcastSink, destination: Option<&str>) -> BroadcastJob {
        let mut upstream = MockUpstreamPort::new();
        upstream
            .expect_fetch()
            .returning(|_| Ok(json!({"price": 1, "score": 50, "label": "Neutral"})));
        let reader = MarketReader::new(
            Arc::new(upstream),
            Endpoint::new(Source::Price, "https://price.test"),
            Endpoint::new(Source::Sentiment, "https://insights.test"),
            ResponseNormalizer::default(),
        );
        BroadcastJob::new(
            Arc::new(Aggregator::new(Arc::new(reader), Symbol::parse("BTC").unwrap())),
            Arc::new(Broadcaster::new(Arc::new(sink), destination.map(str::to_string))),
        )
    }

    #[derive(Default)]
    struct CountingJob {
        runs: Arc<AtomicUsize>,
        panic_on_first: bool,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl TickJob for CountingJob {
        async fn run(&self) -> Result<(), TickError> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            assert!(!(self.panic_on_first && run == 0), "first tick blows up");
            if self.fail {
                return Err(TickError::Broadcast(BroadcastError::Delivery(DeliveryError(
                    "down".to_string(),
                ))));
            }
            Ok(())
        }
    }

    fn settings() -> ScheduleSettings {
        ScheduleSettings {
            first_delay: Duration::from_secs(10),
            interval: Duration::from_secs(300),
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn broadcast_job_without_destination_succeeds() {
        let mut sink = MockBroadcastSink::new();
        sink.expect_send().never();

        assert!(broadcast_job(sink, None).run().await.is_ok());
    }

    #[tokio::test]
    async fn broadcast_job_surfaces_delivery_failure() {
        let mut sink = MockBroadcastSink::new();
        sink.expect_send()
            .times(1)
            .returning(|_, _| Err(DeliveryError("chat not found".to_string())));

        let err = broadcast_job(sink, Some("42")).run().await.unwrap_err();
        assert!(matches!(
            err,
            TickError::Broadcast(BroadcastError::Delivery(_))
        ));
    }

    #[test]
    fn default_settings() {
        let settings = ScheduleSettings::default();
        assert_eq!(settings.first_delay, Duration::from_secs(10));
        assert_eq!(settings.interval, Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_delay_then_fixed_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(
            CountingJob {
                runs: Arc::clone(&runs),
                ..CountingJob::default()
            },
            settings(),
        );
        let stats = scheduler.stats();
        assert_eq!(stats.state(), SchedulerState::Idle);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(9)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(stats.state(), SchedulerState::Running);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(stats.snapshot().ticks_completed, 2);
        assert!(stats.snapshot().last_tick_at.is_some());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_first_delay_leaves_scheduler_idle() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(
            CountingJob {
                runs: Arc::clone(&runs),
                ..CountingJob::default()
            },
            ScheduleSettings {
                first_delay: Duration::MAX,
                interval: Duration::from_secs(300),
            },
        );
        let stats = scheduler.stats();

        tokio::spawn(scheduler.run(CancellationToken::new()))
            .await
            .unwrap();

        assert_eq!(stats.state(), SchedulerState::Idle);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_tick_does_not_stop_loop() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(
            CountingJob {
                runs: Arc::clone(&runs),
                panic_on_first: true,
                ..CountingJob::default()
            },
            settings(),
        );
        let stats = scheduler.stats();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(311)).await;
        settle().await;

        let snapshot = stats.snapshot();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(snapshot.ticks_failed, 1);
        assert_eq!(snapshot.ticks_completed, 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failing_tick_is_counted() {
        let scheduler = Scheduler::new(
            CountingJob {
                fail: true,
                ..CountingJob::default()
            },
            settings(),
        );
        let stats = scheduler.stats();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(11)).await;
        settle().await;
        assert_eq!(stats.snapshot().ticks_failed, 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tick_does_not_delay_next() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(
            CountingJob {
                runs: Arc::clone(&runs),
                delay: Some(Duration::from_secs(1_000)),
                ..CountingJob::default()
            },
            settings(),
        );
        let stats = scheduler.stats();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(611)).await;
        settle().await;

        let snapshot = stats.snapshot();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(snapshot.ticks_started, 3);
        assert_eq!(snapshot.ticks_completed, 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
