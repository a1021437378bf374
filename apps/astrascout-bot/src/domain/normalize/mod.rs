//! Response Normalization
//!
//! Upstream feeds disagree on field names (`price` vs `price_usd`, `label`
//! vs `classification`) and sometimes encode numbers as strings. Each
//! logical field has an ordered list of accepted names; lookup walks the list
//! and takes the first usable value.
//!
//! # Resolution rules
//!
//! - Absent or `null` candidates are skipped.
//! - The first candidate that coerces to the target type wins.
//! - A candidate with the wrong type does not stop the search.
//! - Nothing resolved: `InvalidType` if some candidate had the wrong type,
//!   otherwise `MissingField`.
//!
//! Numbers are held as [`Decimal`]: 28 significant digits, magnitude below
//! roughly `7.9e28`. A JSON number outside that range (`1e29`, `1e-30`, a
//! 32-digit integer) cannot be represented and counts as a wrong-type
//! candidate, so a later candidate may still resolve.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::domain::error::ErrorKind;
use crate::domain::market::{NormalizedQuote, NormalizedSentiment, Symbol, UNKNOWN_PROVENANCE};

/// Default accepted names for the price value.
pub const DEFAULT_PRICE_FIELDS: &[&str] = &["price", "price_usd", "last_price"];

/// Default accepted names for the price provenance label.
pub const DEFAULT_PROVENANCE_FIELDS: &[&str] = &["source", "provider"];

/// Default accepted names for the sentiment score.
pub const DEFAULT_SCORE_FIELDS: &[&str] = &["fear_greed_index", "score", "value"];

/// Default accepted names for the sentiment label.
pub const DEFAULT_LABEL_FIELDS: &[&str] = &["label", "classification", "value_classification"];

// =============================================================================
// Candidate Lists
// =============================================================================

/// Ordered list of JSON keys accepted for one logical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCandidates(Vec<String>);

impl FieldCandidates {
    /// Build a candidate list, dropping blank names.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|n| n.as_ref().trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        )
    }

    /// Parse a comma-separated override such as `"price,last"`.
    #[must_use]
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    /// Candidate names in priority order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// True when no candidate names are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Candidate lists for every normalized field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerFields {
    /// Price value candidates.
    pub price: FieldCandidates,
    /// Price provenance candidates.
    pub provenance: FieldCandidates,
    /// Sentiment score candidates.
    pub score: FieldCandidates,
    /// Sentiment label candidates.
    pub label: FieldCandidates,
}

impl Default for NormalizerFields {
    fn default() -> Self {
        Self {
            price: FieldCandidates::new(DEFAULT_PRICE_FIELDS),
            provenance: FieldCandidates::new(DEFAULT_PROVENANCE_FIELDS),
            score: FieldCandidates::new(DEFAULT_SCORE_FIELDS),
            label: FieldCandidates::new(DEFAULT_LABEL_FIELDS),
        }
    }
}

// =============================================================================
// Normalizer
// =============================================================================

/// Maps raw upstream JSON onto domain readings. Pure and cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ResponseNormalizer {
    fields: NormalizerFields,
}

impl ResponseNormalizer {
    /// Create a normalizer with the given candidate lists.
    #[must_use]
    pub const fn new(fields: NormalizerFields) -> Self {
        Self { fields }
    }

    /// Candidate lists in use.
    #[must_use]
    pub const fn fields(&self) -> &NormalizerFields {
        &self.fields
    }

    /// Extract a price quote for `symbol`.
    ///
    /// The symbol is taken from the request, never from the payload.
    ///
    /// # Errors
    ///
    /// `InvalidType` when the body is not an object or every present price
    /// candidate is unusable; `MissingField` when no candidate is present.
    pub fn normalize_price(
        &self,
        body: &Value,
        symbol: &Symbol,
    ) -> Result<NormalizedQuote, ErrorKind> {
        let object = as_object(body)?;
        let value = resolve(object, &self.fields.price, coerce_decimal)?;
        let provenance = resolve(object, &self.fields.provenance, coerce_label)
            .unwrap_or_else(|_| UNKNOWN_PROVENANCE.to_string());

        Ok(NormalizedQuote {
            symbol: symbol.clone(),
            value,
            provenance,
        })
    }

    /// Extract a sentiment reading. Both score and label must resolve.
    ///
    /// # Errors
    ///
    /// `MissingField` when either part is absent, otherwise `InvalidType`
    /// when either part is present but unusable.
    pub fn normalize_sentiment(&self, body: &Value) -> Result<NormalizedSentiment, ErrorKind> {
        let object = as_object(body)?;
        let score = resolve(object, &self.fields.score, coerce_decimal);
        let label = resolve(object, &self.fields.label, coerce_label);

        match (score, label) {
            (Ok(score), Ok(label)) => Ok(NormalizedSentiment { score, label }),
            (Err(ErrorKind::MissingField), _) | (_, Err(ErrorKind::MissingField)) => {
                Err(ErrorKind::MissingField)
            }
            (Err(kind), _) | (_, Err(kind)) => Err(kind),
        }
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ErrorKind> {
    body.as_object().ok_or(ErrorKind::InvalidType)
}

/// Walk `candidates` in order and return the first value `coerce` accepts.
fn resolve<T>(
    object: &Map<String, Value>,
    candidates: &FieldCandidates,
    coerce: impl Fn(&Value) -> Option<T>,
) -> Result<T, ErrorKind> {
    let mut saw_wrong_type = false;

    for name in candidates.names() {
        let value = match object.get(name) {
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };
        match coerce(value) {
            Some(resolved) => return Ok(resolved),
            None => saw_wrong_type = true,
        }
    }

    if saw_wrong_type {
        Err(ErrorKind::InvalidType)
    } else {
        Err(ErrorKind::MissingField)
    }
}

/// Numbers and numeric-looking strings within `Decimal` range. Booleans,
/// objects and arrays are rejected.
fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Non-blank strings. Blank strings count as absent.
fn coerce_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    fn btc() -> Symbol {
        Symbol::parse("BTC").unwrap()
    }

    fn normalizer() -> ResponseNormalizer {
        ResponseNormalizer::default()
    }

    fn wide_integer_price() -> Value {
        serde_json::from_str(r#"{"price": 12345678901234567890123456789012}"#).unwrap()
    }

    // ========================================================================
    // Price
    // ========================================================================

    #[test]
    fn price_usd_with_source() {
        let quote = normalizer()
            .normalize_price(&json!({"price_usd": 67000, "source": "x"}), &btc())
            .unwrap();
        assert_eq!(quote.symbol, btc());
        assert_eq!(quote.value, Decimal::from(67_000));
        assert_eq!(quote.provenance, "x");
    }

    #[test]
    fn provenance_defaults_to_unknown() {
        let quote = normalizer()
            .normalize_price(&json!({"price": 1.5}), &btc())
            .unwrap();
        assert_eq!(quote.provenance, UNKNOWN_PROVENANCE);
    }

    #[test]
    fn earlier_candidate_wins() {
        let quote = normalizer()
            .normalize_price(&json!({"last_price": 3, "price": 1, "price_usd": 2}), &btc())
            .unwrap();
        assert_eq!(quote.value, Decimal::from(1));
    }

    #[test]
    fn symbol_comes_from_request_not_body() {
        let quote = normalizer()
            .normalize_price(&json!({"price": 1, "symbol": "ETH"}), &btc())
            .unwrap();
        assert_eq!(quote.symbol.as_str(), "BTC");
    }

    #[test_case(json!({"price": "67000.50"}), "67000.50" ; "numeric string")]
    #[test_case(json!({"price": " 42 "}), "42" ; "padded string")]
    #[test_case(json!({"price": "1e3"}), "1000" ; "scientific string")]
    #[test_case(json!({"price": 0.000_123}), "0.000123" ; "small float")]
    #[test_case(json!({"price": null, "price_usd": 5}), "5" ; "null skipped")]
    #[test_case(json!({"price": "n/a", "price_usd": 7}), "7" ; "wrong type does not stop search")]
    #[test_case(json!({"price": 1e29, "price_usd": 8}), "8" ; "out of range does not stop search")]
    fn price_coercion(body: Value, expected: &str) {
        let quote = normalizer().normalize_price(&body, &btc()).unwrap();
        assert_eq!(quote.value, Decimal::from_str(expected).unwrap());
    }

    #[test_case(json!({}), ErrorKind::MissingField ; "empty object")]
    #[test_case(json!({"cost": 10}), ErrorKind::MissingField ; "unknown field")]
    #[test_case(json!({"price": null}), ErrorKind::MissingField ; "only null")]
    #[test_case(json!({"price": "abc"}), ErrorKind::InvalidType ; "non numeric string")]
    #[test_case(json!({"price": true}), ErrorKind::InvalidType ; "boolean")]
    #[test_case(json!({"price": {"usd": 1}}), ErrorKind::InvalidType ; "object")]
    #[test_case(json!({"price": [1]}), ErrorKind::InvalidType ; "array")]
    #[test_case(json!({"price": ""}), ErrorKind::InvalidType ; "empty string")]
    #[test_case(json!({"price": 1e29}), ErrorKind::InvalidType ; "too large")]
    #[test_case(json!({"price": 1e-30}), ErrorKind::InvalidType ; "too small")]
    #[test_case(wide_integer_price(), ErrorKind::InvalidType ; "thirty two digits")]
    #[test_case(json!([{"price": 1}]), ErrorKind::InvalidType ; "array root")]
    #[test_case(json!("67000"), ErrorKind::InvalidType ; "string root")]
    fn price_failures(body: Value, expected: ErrorKind) {
        assert_eq!(normalizer().normalize_price(&body, &btc()), Err(expected));
    }

    #[test]
    fn non_string_provenance_falls_back() {
        let quote = normalizer()
            .normalize_price(&json!({"price": 1, "source": 12, "provider": "feed"}), &btc())
            .unwrap();
        assert_eq!(quote.provenance, "feed");
    }

    #[test]
    fn custom_candidates_replace_defaults() {
        let fields = NormalizerFields {
            price: FieldCandidates::from_csv("rate, ,close"),
            ..NormalizerFields::default()
        };
        let normalizer = ResponseNormalizer::new(fields);
        assert_eq!(normalizer.fields().price.names(), ["rate", "close"]);

        let quote = normalizer
            .normalize_price(&json!({"close": 9, "price": 1}), &btc())
            .unwrap();
        assert_eq!(quote.value, Decimal::from(9));
    }

    // ========================================================================
    // Sentiment
    // ========================================================================

    #[test]
    fn fear_greed_with_classification() {
        let sentiment = normalizer()
            .normalize_sentiment(&json!({"fear_greed_index": 22, "classification": "Extreme Fear"}))
            .unwrap();
        assert_eq!(sentiment.score, Decimal::from(22));
        assert_eq!(sentiment.label, "Extreme Fear");
    }

    #[test]
    fn alternate_names_are_synonyms() {
        let sentiment = normalizer()
            .normalize_sentiment(&json!({"value": "71", "value_classification": "Greed"}))
            .unwrap();
        assert_eq!(sentiment.score, Decimal::from(71));
        assert_eq!(sentiment.label, "Greed");
    }

    #[test_case(json!({"fear_greed_index": 22}), ErrorKind::MissingField ; "label missing")]
    #[test_case(json!({"label": "Fear"}), ErrorKind::MissingField ; "score missing")]
    #[test_case(json!({"score": 22, "label": "   "}), ErrorKind::MissingField ; "blank label")]
    #[test_case(json!({"score": "high", "label": "Fear"}), ErrorKind::InvalidType ; "bad score")]
    #[test_case(json!({"score": 22, "label": 5}), ErrorKind::InvalidType ; "numeric label")]
    #[test_case(json!({"score": [1], "label": 5}), ErrorKind::InvalidType ; "both wrong type")]
    #[test_case(json!({"score": "high"}), ErrorKind::MissingField ; "missing beats invalid")]
    #[test_case(json!(null), ErrorKind::InvalidType ; "null root")]
    fn sentiment_failures(body: Value, expected: ErrorKind) {
        assert_eq!(normalizer().normalize_sentiment(&body), Err(expected));
    }

    // ========================================================================
    // Properties
    // ========================================================================

    fn noise() -> impl Strategy<Value = Map<String, Value>> {
        prop::collection::btree_map("x_[a-z]{1,8}", any::<i64>(), 0..4).prop_map(|m| {
            m.into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn any_accepted_numeric_price_is_returned(
            field in prop::sample::select(DEFAULT_PRICE_FIELDS),
            price in -1_000_000_000_i64..1_000_000_000,
            mut extra in noise(),
        ) {
            extra.insert(field.to_string(), Value::from(price));
            let quote = normalizer()
                .normalize_price(&Value::Object(extra), &btc())
                .unwrap();
            prop_assert_eq!(quote.value, Decimal::from(price));
        }

        #[test]
        fn objects_without_price_fields_are_missing(extra in noise()) {
            prop_assert_eq!(
                normalizer().normalize_price(&Value::Object(extra), &btc()),
                Err(ErrorKind::MissingField)
            );
        }

        #[test]
        fn sentiment_needs_both_parts(
            score in 0_u32..=100,
            label in "[A-Za-z][A-Za-z ]{0,15}",
            include_score: bool,
            include_label: bool,
            mut extra in noise(),
        ) {
            if include_score {
                extra.insert("fear_greed_index".to_string(), Value::from(score));
            }
            if include_label {
                extra.insert("label".to_string(), Value::from(label.clone()));
            }
            let result = normalizer().normalize_sentiment(&Value::Object(extra));

            if include_score && include_label {
                let sentiment = result.unwrap();
                prop_assert_eq!(sentiment.score, Decimal::from(score));
                prop_assert_eq!(sentiment.label, label.trim());
            } else {
                prop_assert_eq!(result, Err(ErrorKind::MissingField));
            }
        }
    }
}
