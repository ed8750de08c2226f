//! Signal model: identifiers, observed values and change notifications

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{STATE_OFF, STATE_ON, STATE_UNAVAILABLE, STATE_UNKNOWN};

/// Error type for invalid signal identifiers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalIdError {
    #[error("signal id must have the form 'domain.object_id'")]
    InvalidFormat,

    #[error("signal id cannot contain whitespace")]
    Whitespace,
}

/// Identifier of a host signal (e.g., "sensor.pillanatnyi_aramerosseg_l1")
///
/// The host names every signal `domain.object_id`; the rules only need the
/// two halves to be present, so the check is intentionally looser than the
/// host's own entity id grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignalId(String);

impl SignalId {
    pub fn new(id: impl Into<String>) -> Result<Self, SignalIdError> {
        let id = id.into();
        if id.chars().any(char::is_whitespace) {
            return Err(SignalIdError::Whitespace);
        }
        match id.split_once('.') {
            Some((domain, object_id)) if !domain.is_empty() && !object_id.is_empty() => {
                Ok(Self(id))
            }
            _ => Err(SignalIdError::InvalidFormat),
        }
    }

    /// The part before the first `.`
    pub fn domain(&self) -> &str {
        self.0.split_once('.').map(|(d, _)| d).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SignalId {
    type Err = SignalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SignalId {
    type Error = SignalIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SignalId> for String {
    fn from(id: SignalId) -> String {
        id.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The last observed value of a signal
///
/// The host reports everything as text. `unknown` and `unavailable` are
/// sentinels and never count as a reading; everything else is kept verbatim
/// so that equality checks compare exactly what the host reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalValue {
    Unknown,
    Unavailable,
    Value(String),
}

impl SignalValue {
    /// Parse a raw host state, recognising the sentinels case-insensitively
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case(STATE_UNKNOWN) {
            Self::Unknown
        } else if raw.eq_ignore_ascii_case(STATE_UNAVAILABLE) {
            Self::Unavailable
        } else {
            Self::Value(raw.to_string())
        }
    }

    /// True for both sentinels
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unknown | Self::Unavailable)
    }

    /// Numeric reading, or `None` for sentinels and non-numeric text
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Value(raw) => raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// The raw text as the host reported it
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => STATE_UNKNOWN,
            Self::Unavailable => STATE_UNAVAILABLE,
            Self::Value(raw) => raw,
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Self::Value(raw) if raw.eq_ignore_ascii_case(STATE_ON))
    }

    pub fn is_off(&self) -> bool {
        matches!(self, Self::Value(raw) if raw.eq_ignore_ascii_case(STATE_OFF))
    }
}

impl From<&str> for SignalValue {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for SignalValue {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<f64> for SignalValue {
    fn from(value: f64) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<SignalValue> for String {
    fn from(value: SignalValue) -> String {
        match value {
            SignalValue::Value(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signal as the host currently holds it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,

    pub value: SignalValue,

    /// When the value last became different from the previous one
    pub last_changed: DateTime<Utc>,

    /// When the value was last written, even if it did not change
    pub last_updated: DateTime<Utc>,
}

impl Signal {
    pub fn new(id: SignalId, value: SignalValue, now: DateTime<Utc>) -> Self {
        Self {
            id,
            value,
            last_changed: now,
            last_updated: now,
        }
    }

    /// Create the successor of this signal, preserving last_changed if the
    /// value is the same
    pub fn with_update(&self, value: SignalValue, now: DateTime<Utc>) -> Self {
        let changed = self.value != value;
        Self {
            id: self.id.clone(),
            last_changed: if changed { now } else { self.last_changed },
            last_updated: now,
            value,
        }
    }
}

/// A push notification that a signal was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalChange {
    pub signal: SignalId,
    /// `None` the first time the host reports the signal
    pub old: Option<SignalValue>,
    pub new: SignalValue,
    pub time: DateTime<Utc>,
}

impl SignalChange {
    /// A write that repeated the previous value
    pub fn is_noop(&self) -> bool {
        self.old.as_ref() == Some(&self.new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_id_parts() {
        let id: SignalId = "sensor.pillanatnyi_aramerosseg_l1".parse().unwrap();
        assert_eq!(id.domain(), "sensor");
        assert_eq!(id.to_string(), "sensor.pillanatnyi_aramerosseg_l1");
    }

    #[test]
    fn test_signal_id_rejects_bad_shapes() {
        assert_eq!(
            "no_separator".parse::<SignalId>().unwrap_err(),
            SignalIdError::InvalidFormat
        );
        assert_eq!(
            ".object".parse::<SignalId>().unwrap_err(),
            SignalIdError::InvalidFormat
        );
        assert_eq!(
            "sensor.".parse::<SignalId>().unwrap_err(),
            SignalIdError::InvalidFormat
        );
        assert_eq!(
            "sensor.water level".parse::<SignalId>().unwrap_err(),
            SignalIdError::Whitespace
        );
    }

    #[test]
    fn test_sentinels_are_case_insensitive() {
        assert_eq!(SignalValue::parse("unknown"), SignalValue::Unknown);
        assert_eq!(SignalValue::parse("Unavailable"), SignalValue::Unavailable);
        assert!(SignalValue::parse("UNKNOWN").is_unavailable());
        assert!(!SignalValue::parse("12.5").is_unavailable());
    }

    #[test]
    fn test_numeric_reading() {
        assert_eq!(SignalValue::parse("16.4").as_number(), Some(16.4));
        assert_eq!(SignalValue::parse(" 3 ").as_number(), Some(3.0));
        assert_eq!(SignalValue::parse("on").as_number(), None);
        assert_eq!(SignalValue::parse("NaN").as_number(), None);
        assert_eq!(SignalValue::Unavailable.as_number(), None);
    }

    #[test]
    fn test_on_off() {
        assert!(SignalValue::parse("on").is_on());
        assert!(SignalValue::parse("off").is_off());
        assert!(!SignalValue::Unknown.is_off());
    }

    #[test]
    fn test_value_serializes_as_host_text() {
        let json = serde_json::to_string(&SignalValue::Unavailable).unwrap();
        assert_eq!(json, "\"unavailable\"");

        let parsed: SignalValue = serde_json::from_str("\"21.0\"").unwrap();
        assert_eq!(parsed, SignalValue::Value("21.0".to_string()));
    }

    #[test]
    fn test_update_preserves_last_changed() {
        let id: SignalId = "sensor.temp".parse().unwrap();
        let t0 = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let t1 = t0 + chrono::Duration::seconds(30);

        let first = Signal::new(id, SignalValue::parse("20"), t0);
        let same = first.with_update(SignalValue::parse("20"), t1);
        assert_eq!(same.last_changed, t0);
        assert_eq!(same.last_updated, t1);

        let changed = same.with_update(SignalValue::parse("21"), t1);
        assert_eq!(changed.last_changed, t1);
    }

    #[test]
    fn test_noop_change() {
        let change = SignalChange {
            signal: "sensor.temp".parse().unwrap(),
            old: Some(SignalValue::parse("20")),
            new: SignalValue::parse("20"),
            time: Utc::now(),
        };
        assert!(change.is_noop());

        let first = SignalChange { old: None, ..change };
        assert!(!first.is_noop());
    }
}
