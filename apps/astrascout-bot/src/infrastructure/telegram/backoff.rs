//! Polling Backoff
//!
//! Exponential backoff with jitter between failed `getUpdates` calls. The
//! poller never gives up; the delay is capped and reset after a success.

use std::time::Duration;

use rand::Rng;

use crate::infrastructure::config::PollingSettings;

/// Backoff tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound on any delay.
    pub max_delay: Duration,
    /// Growth factor per consecutive failure.
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%).
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl BackoffConfig {
    /// Build from polling settings, keeping the default jitter.
    #[must_use]
    pub fn from_settings(settings: &PollingSettings) -> Self {
        Self {
            initial_delay: settings.retry_delay_initial,
            max_delay: settings.retry_delay_max,
            multiplier: settings.retry_delay_multiplier,
            ..Self::default()
        }
    }
}

/// Consecutive-failure backoff state.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    current_delay: Duration,
    failures: u32,
}

impl Backoff {
    /// Create a fresh backoff.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self {
            config,
            current_delay: initial_delay,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let delay = self.apply_jitter(self.current_delay);

        let scaled = self.current_delay.mul_f64(self.config.multiplier.max(1.0));
        self.current_delay = scaled.min(self.config.max_delay);

        delay
    }

    /// Forget previous failures.
    pub const fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.failures = 0;
    }

    /// Consecutive failures since the last reset.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return duration;
        }

        let base = duration.as_secs_f64();
        let range = base * self.config.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-range..=range);
        Duration::from_secs_f64((base + jitter).max(0.001))
    }
}
