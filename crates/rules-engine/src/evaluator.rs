//! Threshold, slack and staleness decisions
//!
//! Pure functions over signal values. Sentinel readings (`unknown`,
//! `unavailable`) and non-numeric text never count as a reading: they can
//! neither exceed a limit nor provide slack.

use rules_core::SignalValue;
use std::time::Duration;

/// Limit of one numeric signal and the margin past it that calls for action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    pub limit: f64,
    /// How far past `limit` a reading must be before action is taken
    pub overload_margin: f64,
}

impl ThresholdConfig {
    /// A plain limit with no overload margin
    pub fn limit(limit: f64) -> Self {
        Self {
            limit,
            overload_margin: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdStatus {
    Below,
    Exceeded,
    Unavailable,
}

/// Compare a reading against its limit; the limit itself counts as exceeded
pub fn evaluate(value: &SignalValue, config: &ThresholdConfig) -> ThresholdStatus {
    match value.as_number() {
        None => ThresholdStatus::Unavailable,
        Some(v) if v >= config.limit => ThresholdStatus::Exceeded,
        Some(_) => ThresholdStatus::Below,
    }
}

/// Amps over the limit when the reading is past the overload margin
///
/// Reaching the margin exactly counts as overloaded.
pub fn overload(value: &SignalValue, config: &ThresholdConfig) -> Option<f64> {
    if evaluate(value, config) != ThresholdStatus::Exceeded {
        return None;
    }
    let excess = value.as_number()? - config.limit;
    (excess >= config.overload_margin).then_some(excess)
}

/// Headroom `limit - value`; negative when over the limit
pub fn slack(value: &SignalValue, config: &ThresholdConfig) -> Option<f64> {
    value.as_number().map(|v| config.limit - v)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlackStatus {
    /// Smallest headroom across every signal
    Available(f64),
    /// At least one signal had no usable reading
    Unavailable,
}

/// Minimum slack over a group of signals
///
/// A single unavailable reading makes the whole group unavailable; an empty
/// group is unavailable too, since there is nothing to vouch for headroom.
pub fn min_slack<'a, I>(readings: I) -> SlackStatus
where
    I: IntoIterator<Item = (&'a SignalValue, &'a ThresholdConfig)>,
{
    let mut min: Option<f64> = None;
    for (value, config) in readings {
        match slack(value, config) {
            Some(s) => min = Some(min.map_or(s, |m| m.min(s))),
            None => return SlackStatus::Unavailable,
        }
    }
    min.map_or(SlackStatus::Unavailable, SlackStatus::Available)
}

/// Whether the group has enough headroom to clear the condition
pub fn can_resume(status: SlackStatus, required_slack: f64) -> bool {
    match status {
        SlackStatus::Available(min) => min >= required_slack,
        SlackStatus::Unavailable => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// The interval has not elapsed yet
    Pending,
    /// The value differs from the snapshot
    Changed,
    /// The value equals the snapshot after a full interval
    Stale,
    /// The current value is a sentinel; reported by the unavailability
    /// check, never as staleness
    Unavailable,
}

/// Compare the current value with the snapshot taken `elapsed` ago
///
/// Only the snapshot is compared, so a value that changed and changed back
/// within one interval looks unchanged.
pub fn check_staleness(
    current: &SignalValue,
    previous: &SignalValue,
    elapsed: Duration,
    interval: Duration,
) -> Staleness {
    if elapsed < interval {
        Staleness::Pending
    } else if current.is_unavailable() {
        Staleness::Unavailable
    } else if current == previous {
        Staleness::Stale
    } else {
        Staleness::Changed
    }
}
