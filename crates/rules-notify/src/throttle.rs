//! Minimum-interval gate in front of a messenger

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{escape_markdown_v2, Messenger, NotifyError};

/// Default minimum time between two notifications for the same key
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(60);

/// The condition a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    ThresholdExceeded,
    ChargeStopped,
    ChargeResumed,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ThresholdExceeded => "threshold_exceeded",
            Self::ChargeStopped => "charge_stopped",
            Self::ChargeResumed => "charge_resumed",
        };
        f.write_str(name)
    }
}

/// Throttle bucket: one signal (or group) and one kind of condition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThrottleKey {
    pub subject: String,
    pub kind: AlertKind,
}

impl ThrottleKey {
    pub fn new(subject: impl Into<String>, kind: AlertKind) -> Self {
        Self {
            subject: subject.into(),
            kind,
        }
    }
}

impl fmt::Display for ThrottleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject, self.kind)
    }
}

/// Sends at most one message per key per `min_interval`
///
/// Only a successful send updates the key's timestamp, so a failed delivery
/// is retried on the next qualifying event.
pub struct ThrottledNotifier {
    messenger: Arc<dyn Messenger>,
    min_interval: Duration,
    last_sent: HashMap<ThrottleKey, DateTime<Utc>>,
}

impl ThrottledNotifier {
    pub fn new(messenger: Arc<dyn Messenger>, min_interval: Duration) -> Self {
        Self {
            messenger,
            min_interval,
            last_sent: HashMap::new(),
        }
    }

    pub fn last_sent(&self, key: &ThrottleKey) -> Option<DateTime<Utc>> {
        self.last_sent.get(key).copied()
    }

    /// Whether a message for `key` would be sent at `now`
    pub fn is_due(&self, key: &ThrottleKey, now: DateTime<Utc>) -> bool {
        match self.last_sent.get(key) {
            None => true,
            // A clock that went backwards never opens the gate early
            Some(last) => (now - *last)
                .to_std()
                .map(|elapsed| elapsed >= self.min_interval)
                .unwrap_or(false),
        }
    }

    /// Escape and send `message` unless `key` is throttled
    ///
    /// Returns `Ok(true)` when sent, `Ok(false)` when throttled.
    pub async fn notify(
        &mut self,
        key: ThrottleKey,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, NotifyError> {
        if !self.is_due(&key, now) {
            debug!(key = %key, text = message, "Notification throttled");
            return Ok(false);
        }

        let escaped = escape_markdown_v2(message);
        match self.messenger.send_message(&escaped).await {
            Ok(()) => {
                debug!(key = %key, channel = %self.messenger.channel_name(), "Notification sent");
                self.last_sent.insert(key, now);
                Ok(true)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Notification failed");
                Err(e)
            }
        }
    }
}
