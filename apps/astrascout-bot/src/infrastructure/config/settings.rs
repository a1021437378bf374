//! Bot Configuration Settings
//!
//! Configuration types for the bot, loaded once from environment variables
//! and immutable afterwards.

use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::application::ports::{AuthHeader, DEFAULT_UPSTREAM_TIMEOUT, Endpoint};
use crate::application::services::ScheduleSettings;
use crate::domain::market::{Source, Symbol};
use crate::domain::normalize::{FieldCandidates, NormalizerFields};

/// Default header used for upstream API keys.
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

/// Default Telegram Bot API base URL.
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Default symbol quoted in scheduled broadcasts.
pub const DEFAULT_REFERENCE_SYMBOL: &str = "BTC";

/// Upper bound for every `*_SECS` setting (30 days).
pub const MAX_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// Chat transport credentials.
#[derive(Clone)]
pub struct Credentials {
    bot_token: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(bot_token: String) -> Self {
        Self { bot_token }
    }

    /// Get the bot token.
    #[must_use]
    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

/// Long-polling settings for the chat transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PollingSettings {
    /// Telegram Bot API base URL.
    pub api_url: String,
    /// Server-side long-poll timeout for `getUpdates`.
    pub poll_timeout: Duration,
    /// Delay after the first failed poll.
    pub retry_delay_initial: Duration,
    /// Maximum delay between failed polls.
    pub retry_delay_max: Duration,
    /// Backoff multiplier between failed polls.
    pub retry_delay_multiplier: f64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            poll_timeout: Duration::from_secs(30),
            retry_delay_initial: Duration::from_secs(1),
            retry_delay_max: Duration::from_secs(60),
            retry_delay_multiplier: 2.0,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Health check HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8090 }
    }
}

/// Complete bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Chat transport credentials.
    pub credentials: Credentials,
    /// Price feed (`GET {base}/{symbol}`).
    pub price_endpoint: Endpoint,
    /// Sentiment feed (`GET {base}`).
    pub sentiment_endpoint: Endpoint,
    /// Accepted field names per normalized field.
    pub fields: NormalizerFields,
    /// Symbol quoted in scheduled broadcasts.
    pub reference_symbol: Symbol,
    /// Chat receiving scheduled broadcasts. `None` disables broadcasting.
    pub broadcast_chat_id: Option<String>,
    /// Broadcast timing.
    pub schedule: ScheduleSettings,
    /// Chat transport polling.
    pub polling: PollingSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl BotConfig {
    /// Create configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or any value is
    /// malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or any value is
    /// malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let bot_token = env.required("ASTRASCOUT_BOT_TOKEN")?;
        let price_url = env.required_url("CRYPTO_API_URL")?;
        let sentiment_url = env.required_url("INSIGHTS_API_URL")?;

        let timeout = env.duration_secs("UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT)?;
        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "UPSTREAM_TIMEOUT_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let price_endpoint = with_optional_auth(
            Endpoint::new(Source::Price, &price_url).with_timeout(timeout),
            &env,
            "CRYPTO_API_KEY",
            "CRYPTO_API_KEY_HEADER",
        );
        let sentiment_endpoint = with_optional_auth(
            Endpoint::new(Source::Sentiment, &sentiment_url).with_timeout(timeout),
            &env,
            "INSIGHTS_API_KEY",
            "INSIGHTS_API_KEY_HEADER",
        );

        let defaults = NormalizerFields::default();
        let fields = NormalizerFields {
            price: env.candidates("PRICE_FIELDS", defaults.price)?,
            provenance: env.candidates("PROVENANCE_FIELDS", defaults.provenance)?,
            score: env.candidates("SENTIMENT_SCORE_FIELDS", defaults.score)?,
            label: env.candidates("SENTIMENT_LABEL_FIELDS", defaults.label)?,
        };

        let reference_raw = env
            .optional("REFERENCE_SYMBOL")
            .unwrap_or_else(|| DEFAULT_REFERENCE_SYMBOL.to_string());
        let reference_symbol =
            Symbol::parse(&reference_raw).map_err(|e| ConfigError::InvalidValue {
                key: "REFERENCE_SYMBOL".to_string(),
                reason: e.to_string(),
            })?;

        let schedule_defaults = ScheduleSettings::default();
        let schedule = ScheduleSettings {
            first_delay: env
                .duration_secs("BROADCAST_FIRST_DELAY_SECS", schedule_defaults.first_delay)?,
            interval: env.duration_secs("BROADCAST_INTERVAL_SECS", schedule_defaults.interval)?,
        };
        if schedule.interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "BROADCAST_INTERVAL_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let polling_defaults = PollingSettings::default();
        let polling = PollingSettings {
            api_url: match env.optional("TELEGRAM_API_URL") {
                Some(raw) => validate_url("TELEGRAM_API_URL", &raw)?,
                None => polling_defaults.api_url,
            },
            poll_timeout: env
                .duration_secs("TELEGRAM_POLL_TIMEOUT_SECS", polling_defaults.poll_timeout)?,
            ..polling_defaults
        };

        let server = ServerSettings {
            health_port: env.parse("HEALTH_PORT", ServerSettings::default().health_port)?,
        };

        Ok(Self {
            credentials: Credentials::new(bot_token),
            price_endpoint,
            sentiment_endpoint,
            fields,
            reference_symbol,
            broadcast_chat_id: env.optional("BROADCAST_CHAT_ID"),
            schedule,
            polling,
            server,
        })
    }

    /// Whether scheduled broadcasts have a destination.
    #[must_use]
    pub const fn broadcast_enabled(&self) -> bool {
        self.broadcast_chat_id.is_some()
    }
}

/// Configuration error.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("environment variable {key} is invalid: {reason}")]
    InvalidValue {
        /// Offending variable.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        let value = (self.lookup)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyValue(key.to_string()));
        }
        Ok(trimmed.to_string())
    }

    fn required_url(&self, key: &str) -> Result<String, ConfigError> {
        let raw = self.required(key)?;
        validate_url(key, &raw)
    }

    /// Unset and blank both read as `None`.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })
    }

    /// Whole seconds, at most [`MAX_DURATION_SECS`] so deadlines never overflow.
    fn duration_secs(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        let secs = self.parse(key, default.as_secs())?;
        if secs > MAX_DURATION_SECS {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("must be at most {MAX_DURATION_SECS} seconds"),
            });
        }
        Ok(Duration::from_secs(secs))
    }

    fn candidates(
        &self,
        key: &str,
        default: FieldCandidates,
    ) -> Result<FieldCandidates, ConfigError> {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };
        let candidates = FieldCandidates::from_csv(&raw);
        if candidates.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: "no field names given".to_string(),
            });
        }
        Ok(candidates)
    }
}

fn with_optional_auth<F>(
    endpoint: Endpoint,
    env: &Env<F>,
    key_var: &str,
    header_var: &str,
) -> Endpoint
where
    F: Fn(&str) -> Option<String>,
{
    match env.optional(key_var) {
        Some(key) => {
            let header = env
                .optional(header_var)
                .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string());
            endpoint.with_auth(AuthHeader::new(header, key))
        }
        None => endpoint,
    }
}

fn validate_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: key.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(raw.to_string())
}
