//! Chat message rendering.

use crate::domain::error::ErrorKind;
use crate::domain::market::{AggregateSnapshot, NormalizedQuote, NormalizedSentiment, Source};

/// Reply to `/start` and `/help`.
pub const HELP_TEXT: &str = "🤖 AstraScout Crypto Bot\n\n\
Commands:\n\
/price BTC - current price for a symbol\n\
/sentiment - Fear & Greed Index (alias /feargreed)\n\
/help - show this message";

/// Reply to `/price` without an argument.
pub const PRICE_USAGE: &str = "Usage: /price BTC";

/// First line of every scheduled broadcast.
pub const BROADCAST_HEADER: &str = "📡 Market update";

/// Line appended when a snapshot carries no data at all.
pub const NO_DATA_LINE: &str = "⚠️ No market data available right now.";

/// `💰 BTC: $67000 (source: x)`
#[must_use]
pub fn quote_line(quote: &NormalizedQuote) -> String {
    format!(
        "💰 {}: ${} (source: {})",
        quote.symbol,
        quote.value.normalize(),
        quote.provenance
    )
}

/// Multi-line sentiment reply.
#[must_use]
pub fn sentiment_reply(sentiment: &NormalizedSentiment) -> String {
    format!(
        "📊 Fear & Greed Index\nScore: {}\nSentiment: {}",
        sentiment.score.normalize(),
        sentiment.label
    )
}

/// Apology for a failed price query.
#[must_use]
pub fn price_apology(symbol: &str) -> String {
    format!("❌ Sorry, could not fetch the price for {symbol} right now.")
}

/// Apology for a failed sentiment query.
#[must_use]
pub fn sentiment_apology() -> String {
    "❌ Sorry, could not fetch the Fear & Greed Index right now.".to_string()
}

/// Reply to a malformed symbol argument.
#[must_use]
pub fn invalid_symbol(reason: &str) -> String {
    format!("⚠️ Invalid symbol: {reason}\n{PRICE_USAGE}")
}

/// Render a snapshot as one broadcast message, marking missing sources.
#[must_use]
pub fn render_snapshot(snapshot: &AggregateSnapshot) -> String {
    let mut out = String::from(BROADCAST_HEADER);

    match snapshot.quote() {
        Some(quote) => push_line(&mut out, &quote_line(quote)),
        None => push_line(
            &mut out,
            &missing_line("💰 Price", snapshot.error_for(Source::Price)),
        ),
    }

    match snapshot.sentiment() {
        Some(s) => push_line(
            &mut out,
            &format!("📊 Fear & Greed: {} ({})", s.score.normalize(), s.label),
        ),
        None => push_line(
            &mut out,
            &missing_line("📊 Sentiment", snapshot.error_for(Source::Sentiment)),
        ),
    }

    if snapshot.is_empty() {
        push_line(&mut out, NO_DATA_LINE);
    }

    push_line(
        &mut out,
        &format!("🕒 {}", snapshot.collected_at().format("%Y-%m-%d %H:%M UTC")),
    );
    out
}

fn missing_line(label: &str, kind: Option<ErrorKind>) -> String {
    match kind {
        Some(kind) => format!("{label}: unavailable ({kind})"),
        None => format!("{label}: unavailable"),
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push('\n');
    out.push_str(line);
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    use super::*;
    use crate::domain::market::Symbol;

    fn quote() -> NormalizedQuote {
        NormalizedQuote {
            symbol: Symbol::parse("btc").unwrap(),
            value: Decimal::from_str("67000.00").unwrap(),
            provenance: "x".to_string(),
        }
    }

    fn sentiment() -> NormalizedSentiment {
        NormalizedSentiment {
            score: Decimal::from(22),
            label: "Extreme Fear".to_string(),
        }
    }

    #[test]
    fn quote_line_strips_trailing_zeros() {
        assert_eq!(quote_line(&quote()), "💰 BTC: $67000 (source: x)");
    }

    #[test]
    fn sentiment_reply_lists_score_and_label() {
        let reply = sentiment_reply(&sentiment());
        assert!(reply.contains("Score: 22"));
        assert!(reply.contains("Sentiment: Extreme Fear"));
    }

    #[test]
    fn full_snapshot_renders_both_sources() {
        let text = render_snapshot(&AggregateSnapshot::from_outcomes(Ok(quote()), Ok(sentiment())));
        assert!(text.starts_with(BROADCAST_HEADER));
        assert!(text.contains("BTC: $67000"));
        assert!(text.contains("Fear & Greed: 22 (Extreme Fear)"));
        assert!(!text.contains("unavailable"));
    }

    #[test]
    fn partial_snapshot_marks_missing_price() {
        let text = render_snapshot(&AggregateSnapshot::from_outcomes(
            Err(ErrorKind::Timeout),
            Ok(sentiment()),
        ));
        assert!(text.contains("💰 Price: unavailable (upstream timed out)"));
        assert!(text.contains("Extreme Fear"));
        assert!(!text.contains(NO_DATA_LINE));
    }

    #[test]
    fn timestamp_is_last_line() {
        let snapshot = AggregateSnapshot::from_outcomes(Ok(quote()), Ok(sentiment()));
        let text = render_snapshot(&snapshot);
        let expected = format!("🕒 {}", snapshot.collected_at().format("%Y-%m-%d %H:%M UTC"));
        assert_eq!(text.lines().last(), Some(expected.as_str()));
    }

    #[test]
    fn empty_snapshot_still_renders_notice() {
        let text = render_snapshot(&AggregateSnapshot::from_outcomes(
            Err(ErrorKind::UpstreamStatus(500)),
            Err(ErrorKind::MissingField),
        ));
        assert!(text.contains("Price: unavailable (upstream returned HTTP 500)"));
        assert!(text.contains("Sentiment: unavailable (required field missing)"));
        assert!(text.contains(NO_DATA_LINE));
    }
}
