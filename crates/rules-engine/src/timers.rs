//! Deadline-ordered timers shared by all monitors
//!
//! The [`TimerQueue`] only keeps deadlines; it never sleeps or spawns. The
//! runtime asks it for the next deadline, waits, and then pops due timers one
//! by one so each firing is delivered serially to the monitor that owns it.

use chrono::{DateTime, Utc};
use rules_core::{Clock, Scheduler, TimerId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::trace;

/// Index of a monitor inside the runtime
pub type OwnerId = usize;

#[derive(Debug, Clone, Copy)]
struct Entry {
    owner: OwnerId,
    repeat: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    queue: BTreeMap<(DateTime<Utc>, TimerId), Entry>,
    deadlines: HashMap<TimerId, DateTime<Utc>>,
}

impl Inner {
    fn insert(&mut self, deadline: DateTime<Utc>, id: TimerId, entry: Entry) {
        self.queue.insert((deadline, id), entry);
        self.deadlines.insert(id, deadline);
    }
}

pub struct TimerQueue {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl TimerQueue {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Arm a timer for `owner`; repeating timers keep their id across firings
    pub fn schedule(&self, owner: OwnerId, delay: Duration, repeat: bool) -> TimerId {
        let deadline = after(self.clock.now(), delay);
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = TimerId::new(inner.next_id);
        let entry = Entry {
            owner,
            repeat: repeat.then_some(delay),
        };
        inner.insert(deadline, id, entry);
        trace!(timer = %id, owner, %deadline, repeat, "Timer scheduled");
        id
    }

    /// Returns false if the timer already fired (one-shot) or is unknown
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut inner = self.lock();
        match inner.deadlines.remove(&id) {
            Some(deadline) => {
                inner.queue.remove(&(deadline, id));
                trace!(timer = %id, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.lock().queue.keys().next().map(|(deadline, _)| *deadline)
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Remove the earliest timer due at `now` and return its owner
    ///
    /// A repeating timer is re-armed at `deadline + interval`; when that is
    /// already in the past it moves to `now + interval` instead of firing
    /// back-to-back to catch up.
    pub fn pop_due(&self, now: DateTime<Utc>) -> Option<(OwnerId, TimerId)> {
        let mut inner = self.lock();
        let (&(deadline, id), _) = inner.queue.first_key_value()?;
        if deadline > now {
            return None;
        }

        let entry = inner.queue.remove(&(deadline, id))?;
        inner.deadlines.remove(&id);

        if let Some(interval) = entry.repeat {
            let mut next = after(deadline, interval);
            if next <= now {
                next = after(now, interval);
            }
            inner.insert(next, id, entry);
        }

        Some((entry.owner, id))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn after(from: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delta| from.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// The [`Scheduler`] one monitor sees: every timer it arms is owned by it
pub struct ScopedScheduler {
    queue: Arc<TimerQueue>,
    owner: OwnerId,
}

impl ScopedScheduler {
    pub fn new(queue: Arc<TimerQueue>, owner: OwnerId) -> Self {
        Self { queue, owner }
    }
}

impl Scheduler for ScopedScheduler {
    fn schedule_once(&self, delay: Duration) -> TimerId {
        self.queue.schedule(self.owner, delay, false)
    }

    fn schedule_every(&self, interval: Duration) -> TimerId {
        self.queue.schedule(self.owner, interval, true)
    }

    fn cancel(&self, timer: TimerId) -> bool {
        self.queue.cancel(timer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules_core::MockClock;

    fn setup() -> (MockClock, TimerQueue) {
        let clock = MockClock::default();
        let queue = TimerQueue::new(Arc::new(clock.clone()));
        (clock, queue)
    }

    #[test]
    fn test_pops_in_deadline_order() {
        let (clock, queue) = setup();
        let late = queue.schedule(1, Duration::from_secs(20), false);
        let early = queue.schedule(2, Duration::from_secs(10), false);

        assert_eq!(queue.pop_due(clock.now()), None);

        clock.advance_seconds(30);
        assert_eq!(queue.pop_due(clock.now()), Some((2, early)));
        assert_eq!(queue.pop_due(clock.now()), Some((1, late)));
        assert_eq!(queue.pop_due(clock.now()), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel() {
        let (clock, queue) = setup();
        let id = queue.schedule(0, Duration::from_secs(5), false);

        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));

        clock.advance_seconds(10);
        assert_eq!(queue.pop_due(clock.now()), None);
    }

    #[test]
    fn test_cancel_after_fire_returns_false() {
        let (clock, queue) = setup();
        let id = queue.schedule(0, Duration::from_secs(5), false);
        clock.advance_seconds(5);
        assert!(queue.pop_due(clock.now()).is_some());
        assert!(!queue.cancel(id));
    }

    #[test]
    fn test_repeating_timer_rearms() {
        let (clock, queue) = setup();
        let start = clock.now();
        let id = queue.schedule(7, Duration::from_secs(60), true);

        clock.advance_seconds(60);
        assert_eq!(queue.pop_due(clock.now()), Some((7, id)));
        assert_eq!(
            queue.next_deadline(),
            Some(start + chrono::Duration::seconds(120))
        );

        // Missed several periods: fire once, then one interval from now
        clock.advance_seconds(300);
        assert_eq!(queue.pop_due(clock.now()), Some((7, id)));
        assert_eq!(queue.pop_due(clock.now()), None);
        assert_eq!(
            queue.next_deadline(),
            Some(clock.now() + chrono::Duration::seconds(60))
        );

        assert!(queue.cancel(id));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_scoped_scheduler_sets_owner() {
        let (clock, queue) = setup();
        let queue = Arc::new(queue);
        let scheduler = ScopedScheduler::new(queue.clone(), 3);

        let id = scheduler.schedule_once(Duration::from_secs(1));
        clock.advance_seconds(1);
        assert_eq!(queue.pop_due(clock.now()), Some((3, id)));
        assert!(!scheduler.cancel(id));
    }
}
