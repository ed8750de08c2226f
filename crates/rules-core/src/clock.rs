//! Time sources
//!
//! Everything that compares timestamps takes `now` from a [`Clock`] so that
//! tests can drive time explicitly instead of sleeping.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// A source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A controllable clock for tests
///
/// Clones share the same underlying instant, so a test can keep one handle
/// and advance time seen by every component holding another.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<RwLock<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific time
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(RwLock::new(time)),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = time;
    }

    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current += duration;
    }

    pub fn advance_seconds(&self, seconds: i64) {
        self.advance(Duration::seconds(seconds));
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}
