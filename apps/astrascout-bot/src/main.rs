//! AstraScout Bot Binary
//!
//! Starts the command poller, the broadcast scheduler and the health server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin astrascout-bot
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `ASTRASCOUT_BOT_TOKEN`: Telegram bot token
//! - `CRYPTO_API_URL`: Price feed base URL (`GET {url}/{symbol}`)
//! - `INSIGHTS_API_URL`: Sentiment feed URL
//!
//! ## Optional
//! - `CRYPTO_API_KEY` / `CRYPTO_API_KEY_HEADER`: Price feed auth (header default: x-api-key)
//! - `INSIGHTS_API_KEY` / `INSIGHTS_API_KEY_HEADER`: Sentiment feed auth
//! - `BROADCAST_CHAT_ID`: Broadcast destination (unset disables broadcasts)
//! - `REFERENCE_SYMBOL`: Symbol quoted in broadcasts (default: BTC)
//! - `UPSTREAM_TIMEOUT_SECS`: Per-request timeout (default: 10)
//! - `BROADCAST_FIRST_DELAY_SECS`: Delay before first broadcast (default: 10)
//! - `BROADCAST_INTERVAL_SECS`: Broadcast period (default: 300)
//! - `PRICE_FIELDS`, `PROVENANCE_FIELDS`, `SENTIMENT_SCORE_FIELDS`, `SENTIMENT_LABEL_FIELDS`:
//!   Comma-separated field name overrides
//! - `TELEGRAM_API_URL`: Bot API base URL (default: <https://api.telegram.org>)
//! - `TELEGRAM_POLL_TIMEOUT_SECS`: Long-poll timeout (default: 30)
//! - `HEALTH_PORT`: Health check HTTP port (default: 8090)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `RUST_LOG`: Log filter (default: astrascout_bot=info)

use std::sync::Arc;

use anyhow::Context;
use astrascout_bot::infrastructure::telemetry;
use astrascout_bot::{
    Aggregator, BackoffConfig, BotConfig, BroadcastJob, BroadcastSink, Broadcaster, CommandRouter,
    HealthServer, HealthServerState, HttpUpstreamClient, MarketReader, QueryService,
    ResponseNormalizer, Scheduler, TelegramClient, TelegramPoller, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialize telemetry")?;

    tracing::info!("Starting AstraScout bot");

    let _metrics_handle = init_metrics().context("failed to install metrics recorder")?;

    let config = BotConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Upstream path
    let upstream = Arc::new(HttpUpstreamClient::new().context("failed to build HTTP client")?);
    let reader = Arc::new(MarketReader::new(
        upstream,
        config.price_endpoint.clone(),
        config.sentiment_endpoint.clone(),
        ResponseNormalizer::new(config.fields.clone()),
    ));

    // Chat transport
    let telegram = Arc::new(
        TelegramClient::new(&config.credentials, &config.polling)
            .context("failed to build Telegram client")?,
    );

    // Scheduled broadcasts
    let aggregator = Arc::new(Aggregator::new(
        Arc::clone(&reader),
        config.reference_symbol.clone(),
    ));
    let broadcaster = Arc::new(Broadcaster::new(
        Arc::clone(&telegram) as Arc<dyn BroadcastSink>,
        config.broadcast_chat_id.clone(),
    ));
    let broadcast_enabled = broadcaster.is_enabled();
    let scheduler = Scheduler::new(BroadcastJob::new(aggregator, broadcaster), config.schedule);
    let scheduler_stats = scheduler.stats();

    // On-demand queries
    let router = Arc::new(CommandRouter::new(Arc::new(QueryService::new(reader))));
    let poller = TelegramPoller::new(
        Arc::clone(&telegram),
        router,
        BackoffConfig::from_settings(&config.polling),
    );

    // Health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        scheduler_stats,
        broadcast_enabled,
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );

    tokio::spawn(scheduler.run(shutdown_token.clone()));
    tokio::spawn(poller.run(shutdown_token.clone()));
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    tracing::info!("AstraScout bot ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("AstraScout bot stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &BotConfig) {
    tracing::info!(
        price_url = config.price_endpoint.base_url(),
        sentiment_url = config.sentiment_endpoint.base_url(),
        reference_symbol = %config.reference_symbol,
        broadcast_enabled = config.broadcast_enabled(),
        first_delay_secs = config.schedule.first_delay.as_secs(),
        interval_secs = config.schedule.interval.as_secs(),
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(
        price_fields = ?config.fields.price.names(),
        score_fields = ?config.fields.score.names(),
        label_fields = ?config.fields.label.names(),
        "Normalizer candidates"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
