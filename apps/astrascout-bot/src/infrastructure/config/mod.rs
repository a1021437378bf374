//! Configuration Module
//!
//! Configuration loading for the bot.

mod settings;

pub use settings::{
    BotConfig, ConfigError, Credentials, DEFAULT_API_KEY_HEADER, DEFAULT_REFERENCE_SYMBOL,
    DEFAULT_TELEGRAM_API_URL, MAX_DURATION_SECS, PollingSettings, ServerSettings,
};
