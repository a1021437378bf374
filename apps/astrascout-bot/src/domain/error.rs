//! Error Taxonomy
//!
//! Every failure in the fetch, normalize and deliver pipeline is described by
//! an [`ErrorKind`]. Kinds travel as values through every layer; callers
//! decide whether to absorb, format or log them.

use thiserror::Error;

/// Classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// The upstream did not answer within the request timeout.
    #[error("upstream timed out")]
    Timeout,

    /// The upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    /// The upstream answered 2xx but the body was not valid JSON.
    #[error("upstream returned a malformed response")]
    MalformedResponse,

    /// No accepted field name was present in the payload.
    #[error("required field missing")]
    MissingField,

    /// A candidate field was present but could not be coerced.
    #[error("field has an unexpected type")]
    InvalidType,

    /// A required piece of configuration (e.g. a broadcast destination) is absent.
    #[error("not configured")]
    Unconfigured,

    /// The request never produced a response (DNS, refused connection, TLS).
    #[error("upstream unreachable")]
    Transport,
}

impl ErrorKind {
    /// Stable label used in metrics and structured logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::UpstreamStatus(_) => "upstream_status",
            Self::MalformedResponse => "malformed_response",
            Self::MissingField => "missing_field",
            Self::InvalidType => "invalid_type",
            Self::Unconfigured => "unconfigured",
            Self::Transport => "transport",
        }
    }
}
