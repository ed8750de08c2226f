//! Event loop that drives the monitors
//!
//! The runtime owns every monitor and delivers signal changes and timer
//! firings to them one at a time. A monitor returning an error is logged
//! and the loop carries on with the next delivery.

use rules_core::{Clock, SignalChange, SignalId, SignalSource, TimerId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::monitor::{report, Monitor, MonitorContext};
use crate::timers::{OwnerId, ScopedScheduler, TimerQueue};

pub struct Runtime {
    monitors: Vec<Box<dyn Monitor>>,
    watchers: HashMap<SignalId, Vec<OwnerId>>,
    timers: Arc<TimerQueue>,
    signals: Arc<dyn SignalSource>,
    clock: Arc<dyn Clock>,
}

impl Runtime {
    pub fn new(signals: Arc<dyn SignalSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            monitors: Vec::new(),
            watchers: HashMap::new(),
            timers: Arc::new(TimerQueue::new(clock.clone())),
            signals,
            clock,
        }
    }

    /// Add a monitor and index the signals it watches
    pub fn register(&mut self, monitor: Box<dyn Monitor>) -> OwnerId {
        let owner = self.monitors.len();
        for signal in monitor.watched_signals() {
            self.watchers.entry(signal).or_default().push(owner);
        }
        debug!(monitor = monitor.name(), owner, "Monitor registered");
        self.monitors.push(monitor);
        owner
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Start every registered monitor
    pub async fn start(&mut self) {
        let now = self.clock.now();
        for (owner, monitor) in self.monitors.iter_mut().enumerate() {
            let scheduler = ScopedScheduler::new(self.timers.clone(), owner);
            let ctx = MonitorContext {
                signals: self.signals.as_ref(),
                timers: &scheduler,
                now,
            };
            match monitor.start(&ctx).await {
                Ok(()) => info!(monitor = monitor.name(), "Monitor started"),
                Err(e) => report(monitor.name(), &e),
            }
        }
    }

    /// Deliver a change to every monitor watching its signal
    pub async fn handle_change(&mut self, change: &SignalChange) {
        if change.is_noop() {
            trace!(signal = %change.signal, "Ignoring unchanged value");
            return;
        }
        let Some(owners) = self.watchers.get(&change.signal) else {
            return;
        };

        let now = self.clock.now();
        for &owner in owners {
            let monitor = &mut self.monitors[owner];
            let scheduler = ScopedScheduler::new(self.timers.clone(), owner);
            let ctx = MonitorContext {
                signals: self.signals.as_ref(),
                timers: &scheduler,
                now,
            };
            if let Err(e) = monitor.on_signal_changed(change, &ctx).await {
                report(monitor.name(), &e);
            }
        }
    }

    /// Fire every timer that is due, earliest first; returns how many fired
    pub async fn fire_due_timers(&mut self) -> usize {
        let mut fired = 0;
        loop {
            let now = self.clock.now();
            let Some((owner, timer)) = self.timers.pop_due(now) else {
                break;
            };
            self.deliver_timer(owner, timer, now).await;
            fired += 1;
        }
        fired
    }

    async fn deliver_timer(&mut self, owner: OwnerId, timer: TimerId, now: chrono::DateTime<chrono::Utc>) {
        let Some(monitor) = self.monitors.get_mut(owner) else {
            warn!(%timer, owner, "Timer for unknown monitor");
            return;
        };
        let scheduler = ScopedScheduler::new(self.timers.clone(), owner);
        let ctx = MonitorContext {
            signals: self.signals.as_ref(),
            timers: &scheduler,
            now,
        };
        trace!(monitor = monitor.name(), %timer, "Timer fired");
        if let Err(e) = monitor.on_timer(timer, &ctx).await {
            report(monitor.name(), &e);
        }
    }

    /// Process changes and timers until `shutdown` resolves or the change
    /// channel closes
    pub async fn run<F>(&mut self, mut changes: broadcast::Receiver<SignalChange>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(monitors = self.monitors.len(), "Rules runtime running");

        loop {
            let wait = self
                .timers
                .next_deadline()
                .map(|deadline| (deadline - self.clock.now()).to_std().unwrap_or(Duration::ZERO));

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
                received = changes.recv() => {
                    match received {
                        Ok(change) => self.handle_change(&change).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Rules runtime lagged by {} changes", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("Signal bus closed, stopping rules runtime");
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep(wait.unwrap_or(Duration::ZERO)), if wait.is_some() => {
                    self.fire_due_timers().await;
                }
            }
        }

        info!("Rules runtime stopped");
    }
}
