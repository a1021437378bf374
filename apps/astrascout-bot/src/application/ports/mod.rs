//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `UpstreamPort`: Single-shot JSON GET against a price or sentiment feed
//! - `BroadcastSink`: Delivery of one outbound chat message

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::error::ErrorKind;
use crate::domain::market::Source;

/// Default bound on a single upstream request.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Upstream Request / Result
// =============================================================================

/// One upstream GET. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    source: Source,
    url: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
}

impl UpstreamRequest {
    /// Create a GET request against `url` with the default timeout.
    #[must_use]
    pub fn get(source: Source, url: impl Into<String>) -> Self {
        Self {
            source,
            url: url.into(),
            headers: Vec::new(),
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Add a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// HTTP method. Upstreams are only ever read.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        "GET"
    }

    /// Which feed this request targets.
    #[must_use]
    pub const fn source(&self) -> Source {
        self.source
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Extra headers, in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Bound on the whole request.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for UpstreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("UpstreamRequest")
            .field("source", &self.source)
            .field("method", &self.method())
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A failed upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct UpstreamError {
    /// Classified failure.
    pub kind: ErrorKind,
    /// Free-form context for logs.
    pub detail: String,
}

impl UpstreamError {
    /// Create a new upstream error.
    #[must_use]
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Raw JSON body or a classified failure. Never partially populated.
pub type UpstreamResult = Result<Value, UpstreamError>;

// =============================================================================
// Endpoints
// =============================================================================

/// Header carrying an upstream API key.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    name: String,
    value: String,
}

impl AuthHeader {
    /// Create an auth header.
    #[must_use]
    pub const fn new(name: String, value: String) -> Self {
        Self { name, value }
    }

    /// Header name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Static description of one upstream feed, used to build requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    source: Source,
    base_url: String,
    auth: Option<AuthHeader>,
    timeout: Duration,
}

impl Endpoint {
    /// Create an endpoint. A trailing `/` on `base_url` is dropped.
    #[must_use]
    pub fn new(source: Source, base_url: &str) -> Self {
        Self {
            source,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: None,
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Attach an auth header sent with every request.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthHeader) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured auth header, if any.
    #[must_use]
    pub const fn auth(&self) -> Option<&AuthHeader> {
        self.auth.as_ref()
    }

    /// `GET {base}`.
    #[must_use]
    pub fn request(&self) -> UpstreamRequest {
        self.build(self.base_url.clone())
    }

    /// `GET {base}/{segment}`.
    #[must_use]
    pub fn request_for(&self, segment: &str) -> UpstreamRequest {
        self.build(format!("{}/{segment}", self.base_url))
    }

    fn build(&self, url: String) -> UpstreamRequest {
        let request = UpstreamRequest::get(self.source, url).with_timeout(self.timeout);
        match &self.auth {
            Some(auth) => request.with_header(auth.name.clone(), auth.value.clone()),
            None => request,
        }
    }
}

// =============================================================================
// Driven Ports
// =============================================================================

/// Port for fetching JSON from an upstream feed.
///
/// Single-shot: implementations never retry and hold no state between calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamPort: Send + Sync {
    /// Perform the request and return the parsed body.
    async fn fetch(&self, request: &UpstreamRequest) -> UpstreamResult;
}

/// Outbound message delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Port for delivering a chat message to a destination.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    /// Send `text` to `destination` (an opaque chat id).
    async fn send(&self, destination: &str, text: &str) -> Result<(), DeliveryError>;
}
