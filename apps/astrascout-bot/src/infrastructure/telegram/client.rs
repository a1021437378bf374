//! Telegram Bot API Client
//!
//! Minimal `getUpdates` / `sendMessage` client over `reqwest`. Also serves
//! as the [`BroadcastSink`] for scheduled broadcasts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::ports::{BroadcastSink, DeliveryError};
use crate::infrastructure::config::{Credentials, PollingSettings};

/// Slack added on top of the long-poll timeout for the HTTP request itself.
const REQUEST_SLACK: Duration = Duration::from_secs(10);

/// Telegram transport error.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// The request failed before a response arrived.
    #[error("telegram request failed: {0}")]
    Http(String),

    /// The response could not be decoded.
    #[error("telegram response could not be decoded: {0}")]
    Decode(String),

    /// The Bot API reported `ok: false`.
    #[error("telegram API error {code}: {description}")]
    Api {
        /// Bot API error code (0 when absent).
        code: i64,
        /// Bot API error description.
        description: String,
    },
}

impl From<reqwest::Error> for TelegramError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs embed the bot token.
        Self::Http(err.without_url().to_string())
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

/// One incoming update. Only text messages are of interest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Update {
    /// Monotonic update id used for acknowledgement.
    pub update_id: i64,
    /// The message, if this update carries one.
    pub message: Option<Message>,
}

/// An incoming chat message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    /// Chat the message was posted in.
    pub chat: Chat,
    /// Message text, absent for stickers, photos, etc.
    pub text: Option<String>,
}

/// Chat reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Chat {
    /// Chat id.
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

// =============================================================================
// Client
// =============================================================================

/// Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
    poll_timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &"[REDACTED]")
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a client for the bot identified by `credentials`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        credentials: &Credentials,
        settings: &PollingSettings,
    ) -> Result<Self, TelegramError> {
        let http = Client::builder()
            .timeout(settings.poll_timeout.saturating_add(REQUEST_SLACK))
            .build()?;
        Ok(Self {
            http,
            base_url: format!(
                "{}/bot{}",
                settings.api_url.trim_end_matches('/'),
                credentials.bot_token()
            ),
            poll_timeout: settings.poll_timeout,
        })
    }

    /// Long-poll for updates after `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, decode or API failure.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        self.poll(offset, self.poll_timeout).await
    }

    /// Acknowledge everything queued while the bot was offline.
    ///
    /// Returns the offset to poll from next, or `None` if nothing was queued.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, decode or API failure.
    pub async fn drop_pending_updates(&self) -> Result<Option<i64>, TelegramError> {
        let latest = self.poll(Some(-1), Duration::ZERO).await?;
        let next = latest.iter().map(|u| u.update_id + 1).max();
        if let Some(offset) = next {
            tracing::info!(offset, "Dropped pending updates");
        }
        Ok(next)
    }

    /// Send a plain-text message.
    ///
    /// # Errors
    ///
    /// Returns an error on transport, decode or API failure.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError> {
        let response = self
            .http
            .post(format!("{}/sendMessage", self.base_url))
            .json(&SendMessage { chat_id, text })
            .send()
            .await?;
        decode::<serde_json::Value>(response).await.map(|_| ())
    }

    async fn poll(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut request = self
            .http
            .get(format!("{}/getUpdates", self.base_url))
            .query(&[("timeout", timeout.as_secs().to_string())])
            .query(&[("allowed_updates", r#"["message"]"#)]);
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset.to_string())]);
        }
        decode(request.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TelegramError> {
    let status = response.status();
    let body = response.bytes().await?;
    let parsed: ApiResponse<T> = serde_json::from_slice(&body)
        .map_err(|e| TelegramError::Decode(format!("HTTP {status}: {e}")))?;

    match parsed {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse {
            ok: true,
            result: None,
            ..
        } => Err(TelegramError::Decode("missing result".to_string())),
        ApiResponse {
            description,
            error_code,
            ..
        } => Err(TelegramError::Api {
            code: error_code.unwrap_or(0),
            description: description.unwrap_or_default(),
        }),
    }
}

#[async_trait]
impl BroadcastSink for TelegramClient {
    async fn send(&self, destination: &str, text: &str) -> Result<(), DeliveryError> {
        self.send_message(destination, text)
            .await
            .map_err(|e| DeliveryError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> TelegramClient {
        TelegramClient::new(
            &Credentials::new("42:token".to_string()),
            &PollingSettings {
                api_url: server.uri(),
                poll_timeout: Duration::from_secs(1),
                ..PollingSettings::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn get_updates_parses_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bot42:token/getUpdates"))
            .and(query_param("offset", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    {
                        "update_id": 7,
                        "message": {"message_id": 1, "chat": {"id": 99}, "text": "/help"}
                    },
                    {"update_id": 8, "edited_message": {}}
                ]
            })))
            .mount(&server)
            .await;

        let updates = client(&server).get_updates(Some(7)).await.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message.as_ref().unwrap().chat.id, 99);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/help"));
        assert!(updates[1].message.is_none());
    }

    #[tokio::test]
    async fn drop_pending_returns_next_offset() {
        let server = MockServer::start().await;
        Mock::given(path("/bot42:token/getUpdates"))
            .and(query_param("offset", "-1"))
            .and(query_param("timeout", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{"update_id": 41}]
            })))
            .mount(&server)
            .await;

        assert_eq!(client(&server).drop_pending_updates().await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn send_message_posts_chat_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot42:token/sendMessage"))
            .and(body_json(json!({"chat_id": "-100", "text": "hi"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        client(&server).send("-100", "hi").await.unwrap();
    }

    #[tokio::test]
    async fn api_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let err = client(&server).send_message("1", "x").await.unwrap_err();
        assert!(matches!(err, TelegramError::Api { code: 400, .. }));
    }

    #[tokio::test]
    async fn errors_do_not_leak_token() {
        let settings = PollingSettings {
            api_url: "http://127.0.0.1:1".to_string(),
            poll_timeout: Duration::from_secs(1),
            ..PollingSettings::default()
        };
        let credentials = Credentials::new("42:secret".to_string());
        let client = TelegramClient::new(&credentials, &settings).unwrap();

        let err = client.send_message("1", "x").await.unwrap_err();
        assert!(!err.to_string().contains("42:secret"));
        assert!(!format!("{client:?}").contains("42:secret"));
    }
}
