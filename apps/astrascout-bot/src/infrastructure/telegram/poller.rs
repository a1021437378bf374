//! Update Poller
//!
//! Long-polls Telegram for commands and replies in the originating chat.
//! Each update is handled on its own task so a slow upstream never stalls
//! polling.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::backoff::{Backoff, BackoffConfig};
use super::client::{TelegramClient, Update};
use crate::application::services::CommandRouter;

/// Inbound command loop.
pub struct TelegramPoller {
    client: Arc<TelegramClient>,
    router: Arc<CommandRouter>,
    backoff: BackoffConfig,
}

impl TelegramPoller {
    /// Create a poller.
    #[must_use]
    pub const fn new(
        client: Arc<TelegramClient>,
        router: Arc<CommandRouter>,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            client,
            router,
            backoff,
        }
    }

    /// Poll until `cancel` fires. Errors are retried with backoff.
    pub async fn run(self, cancel: CancellationToken) {
        let mut offset = match self.client.drop_pending_updates().await {
            Ok(offset) => offset,
            Err(e) => {
                tracing::warn!(error = %e, "Could not drop pending updates");
                None
            }
        };
        let mut backoff = Backoff::new(self.backoff.clone());
        tracing::info!("Command poller started");

        loop {
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = self.client.get_updates(offset) => result,
            };

            match result {
                Ok(updates) => {
                    backoff.reset();
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.dispatch(update);
                    }
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        failures = backoff.failures(),
                        retry_in_ms = delay.as_millis(),
                        "Polling failed"
                    );
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::debug!("Command poller stopped");
    }

    fn dispatch(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text else {
            return;
        };

        let client = Arc::clone(&self.client);
        let router = Arc::clone(&self.router);
        let chat_id = message.chat.id.to_string();

        tokio::spawn(async move {
            let Some(reply) = router.handle(&text).await else {
                return;
            };
            if let Err(e) = client.send_message(&chat_id, &reply).await {
                tracing::warn!(chat_id = %chat_id, error = %e, "Reply delivery failed");
            }
        });
    }
}
