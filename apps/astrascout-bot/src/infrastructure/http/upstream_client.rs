//! HTTP Upstream Client
//!
//! `reqwest` implementation of [`UpstreamPort`]. Single-shot GET with a
//! per-request timeout; the body is only parsed on a 2xx status.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::application::ports::{UpstreamError, UpstreamPort, UpstreamRequest, UpstreamResult};
use crate::domain::error::ErrorKind;

const USER_AGENT: &str = concat!("astrascout-bot/", env!("CARGO_PKG_VERSION"));

/// Upstream client over a shared connection pool.
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    client: Client,
}

impl HttpUpstreamClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamPort for HttpUpstreamClient {
    async fn fetch(&self, request: &UpstreamRequest) -> UpstreamResult {
        let mut builder = self
            .client
            .get(request.url())
            .timeout(request.timeout());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(&e, request))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::new(
                ErrorKind::UpstreamStatus(status.as_u16()),
                format!("GET {} returned {status}", request.url()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&e, request))?;

        serde_json::from_slice::<Value>(&body).map_err(|e| {
            UpstreamError::new(
                ErrorKind::MalformedResponse,
                format!("GET {}: {e}", request.url()),
            )
        })
    }
}

fn classify(err: &reqwest::Error, request: &UpstreamRequest) -> UpstreamError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::Transport
    };
    UpstreamError::new(kind, format!("GET {}: {err}", request.url()))
}
