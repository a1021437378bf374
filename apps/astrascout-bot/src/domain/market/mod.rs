//! Market Readings
//!
//! Canonical representations of what the upstream feeds report: a price
//! quote, a sentiment reading, and the per-tick snapshot combining both.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::error::ErrorKind;

/// Provenance reported when a price payload carries no source label.
pub const UNKNOWN_PROVENANCE: &str = "unknown";

/// Maximum accepted symbol length.
const MAX_SYMBOL_LEN: usize = 15;

// =============================================================================
// Symbol
// =============================================================================

/// A tracked asset ticker, normalized to uppercase.
///
/// Symbols end up in a URL path segment, so only ASCII alphanumerics,
/// `-` and `.` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize user input.
    ///
    /// # Errors
    ///
    /// Returns `SymbolError` if the input is empty, too long, or contains
    /// characters outside the accepted set.
    pub fn parse(raw: &str) -> Result<Self, SymbolError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SymbolError::Empty);
        }
        if trimmed.len() > MAX_SYMBOL_LEN {
            return Err(SymbolError::TooLong(trimmed.len()));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '.'))
        {
            return Err(SymbolError::InvalidCharacter(bad));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejected symbol input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    /// No symbol was given.
    #[error("symbol is empty")]
    Empty,
    /// Symbol exceeds the maximum length.
    #[error("symbol is too long ({0} characters)")]
    TooLong(usize),
    /// Symbol contains an unsupported character.
    #[error("symbol contains invalid character {0:?}")]
    InvalidCharacter(char),
}

// =============================================================================
// Readings
// =============================================================================

/// A price reading for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuote {
    /// The symbol the price was requested for.
    pub symbol: Symbol,
    /// The resolved price.
    pub value: Decimal,
    /// Self-reported source label, or [`UNKNOWN_PROVENANCE`].
    pub provenance: String,
}

/// A market sentiment reading (e.g. a fear & greed index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSentiment {
    /// Numeric index value.
    pub score: Decimal,
    /// Human-readable classification.
    pub label: String,
}

/// Upstream a snapshot field came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// The price feed.
    Price,
    /// The sentiment feed.
    Sentiment,
}

impl Source {
    /// Stable label used in logs, metrics and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Sentiment => "sentiment",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed source within one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceError {
    /// Which upstream failed.
    pub source: Source,
    /// Why it failed.
    pub kind: ErrorKind,
}

// =============================================================================
// Aggregate Snapshot
// =============================================================================

/// Point-in-time result of querying both upstreams.
///
/// Built once per scheduler tick and never mutated afterwards. A field is
/// absent exactly when its source appears in [`errors`](Self::errors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSnapshot {
    quote: Option<NormalizedQuote>,
    sentiment: Option<NormalizedSentiment>,
    errors: Vec<SourceError>,
    collected_at: DateTime<Utc>,
}

impl AggregateSnapshot {
    /// Build a snapshot from per-source outcomes, in collection order.
    #[must_use]
    pub fn from_outcomes(
        quote: Result<NormalizedQuote, ErrorKind>,
        sentiment: Result<NormalizedSentiment, ErrorKind>,
    ) -> Self {
        let mut errors = Vec::with_capacity(2);
        let quote = match quote {
            Ok(q) => Some(q),
            Err(kind) => {
                errors.push(SourceError {
                    source: Source::Price,
                    kind,
                });
                None
            }
        };
        let sentiment = match sentiment {
            Ok(s) => Some(s),
            Err(kind) => {
                errors.push(SourceError {
                    source: Source::Sentiment,
                    kind,
                });
                None
            }
        };

        Self {
            quote,
            sentiment,
            errors,
            collected_at: Utc::now(),
        }
    }

    /// The price reading, if the price source succeeded.
    #[must_use]
    pub const fn quote(&self) -> Option<&NormalizedQuote> {
        self.quote.as_ref()
    }

    /// The sentiment reading, if the sentiment source succeeded.
    #[must_use]
    pub const fn sentiment(&self) -> Option<&NormalizedSentiment> {
        self.sentiment.as_ref()
    }

    /// Failed sources, price first.
    #[must_use]
    pub fn errors(&self) -> &[SourceError] {
        &self.errors
    }

    /// When the snapshot was assembled.
    #[must_use]
    pub const fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    /// Error recorded for a source, if any.
    #[must_use]
    pub fn error_for(&self, source: Source) -> Option<ErrorKind> {
        self.errors
            .iter()
            .find(|e| e.source == source)
            .map(|e| e.kind)
    }

    /// True when neither source produced data.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.quote.is_none() && self.sentiment.is_none()
    }
}
