//! Exchange rate abstractions and core types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// A USD to Naira sell rate. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Rate(f64);

impl Rate {
    /// Returns `None` for zero, negative, NaN or infinite values.
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Rate(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Rate::new(value)
            .ok_or_else(|| serde::de::Error::custom(format!("rate must be positive: {value}")))
    }
}

/// A rate together with the moment it was obtained. Never mutated, only replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub rate: Rate,
    pub fetched_at: DateTime<Utc>,
}

impl RateSnapshot {
    pub fn new(rate: Rate, fetched_at: DateTime<Utc>) -> Self {
        Self { rate, fetched_at }
    }

    pub fn now(rate: Rate) -> Self {
        Self::new(rate, Utc::now())
    }

    /// Strict comparison: a snapshot exactly `max_age` old is stale.
    pub fn is_fresh_at(&self, max_age: std::time::Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => now.signed_duration_since(self.fetched_at) < max_age,
            Err(_) => true,
        }
    }
}

/// Failure of a single attempt to read the rate from the source page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Rate field `{0}` not found on page")]
    FieldNotFound(String),

    #[error("USD sell rate is empty")]
    EmptyField,

    #[error("Invalid rate value: {0:?}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Terminal failure to produce a rate, after retries and fallbacks.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RateError {
    #[error("Failed to get exchange rate after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Makes exactly one attempt to read the current sell rate.
    async fn fetch(&self) -> Result<Rate, FetchError>;
}

#[async_trait]
impl<T: RateSource + ?Sized> RateSource for std::sync::Arc<T> {
    async fn fetch(&self) -> Result<Rate, FetchError> {
        (**self).fetch().await
    }
}

/// Turns the text of the rate field into a rate.
///
/// Thousands separators are stripped, so `"1,485.50"` parses as `1485.5`.
pub fn parse_rate_text(text: &str) -> Result<Rate, FetchError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(FetchError::EmptyField);
    }

    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned
        .parse()
        .map_err(|_| FetchError::Parse(text.to_string()))?;
    Rate::new(value).ok_or_else(|| FetchError::Parse(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_rate_rejects_non_positive() {
        assert!(Rate::new(0.0).is_none());
        assert!(Rate::new(-1.0).is_none());
        assert!(Rate::new(f64::NAN).is_none());
        assert!(Rate::new(f64::INFINITY).is_none());
        assert_eq!(Rate::new(1500.0).map(|r| r.value()), Some(1500.0));
    }

    #[test]
    fn test_rate_deserialization_validates() {
        let rate: Rate = serde_json::from_str("1480.5").unwrap();
        assert_eq!(rate.value(), 1480.5);
        assert!(serde_json::from_str::<Rate>("0").is_err());
    }

    #[test]
    fn test_parse_rate_text() {
        assert_eq!(parse_rate_text("1,485.50").unwrap().value(), 1485.5);
        assert_eq!(parse_rate_text("  1500 \n").unwrap().value(), 1500.0);
        assert_eq!(parse_rate_text("1,234,567").unwrap().value(), 1234567.0);
    }

    #[test]
    fn test_parse_rate_text_failures() {
        assert!(matches!(parse_rate_text(""), Err(FetchError::EmptyField)));
        assert!(matches!(parse_rate_text("   "), Err(FetchError::EmptyField)));
        assert!(matches!(parse_rate_text("0"), Err(FetchError::Parse(_))));
        assert!(matches!(parse_rate_text("N/A"), Err(FetchError::Parse(_))));
        assert!(matches!(parse_rate_text("-5"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_snapshot_freshness_boundary() {
        let rate = Rate::new(1500.0).unwrap();
        let fetched_at = Utc::now();
        let snapshot = RateSnapshot::new(rate, fetched_at);
        let max_age = std::time::Duration::from_secs(3600);

        assert!(snapshot.is_fresh_at(max_age, fetched_at));
        assert!(snapshot.is_fresh_at(max_age, fetched_at + Duration::seconds(3599)));
        assert!(!snapshot.is_fresh_at(max_age, fetched_at + Duration::seconds(3600)));
        assert!(!snapshot.is_fresh_at(max_age, fetched_at + Duration::seconds(7200)));
    }
}
