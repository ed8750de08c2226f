//! Shared harness for rules-engine integration tests
//!
//! Wires a [`Runtime`] to the in-process host (signal store, change bus,
//! service registry) with a [`MockClock`], and records every service call.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use rules_core::{Clock, MockClock, ServiceError, ServiceRef, SignalChange, SignalId, SignalValue};
use rules_engine::{Monitor, Runtime};
use rules_host::{ServiceRegistry, SignalBus, SignalStore};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

pub const NOTIFY: &str = "notify/mobile_app";
pub const STOP: &str = "easee/pause";
pub const START: &str = "easee/resume";

pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn id(raw: &str) -> SignalId {
    raw.parse().unwrap()
}

pub fn service(raw: &str) -> ServiceRef {
    raw.parse().unwrap()
}

/// Every service call that reached the registry, in order
#[derive(Clone, Default)]
pub struct Calls {
    log: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl Calls {
    pub fn all(&self) -> Vec<(String, serde_json::Value)> {
        self.log.lock().unwrap().clone()
    }

    pub fn to(&self, service: &str) -> Vec<serde_json::Value> {
        self.all()
            .into_iter()
            .filter(|(s, _)| s == service)
            .map(|(_, data)| data)
            .collect()
    }

    /// Messages delivered to a notify service
    pub fn messages(&self, service: &str) -> Vec<String> {
        self.to(service)
            .iter()
            .map(|data| data["message"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn set_failing(&self, service: &str, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(service.to_string());
        } else {
            set.remove(service);
        }
    }
}

pub struct Harness {
    pub clock: MockClock,
    pub store: Arc<SignalStore>,
    pub registry: Arc<ServiceRegistry>,
    pub calls: Calls,
    pub runtime: Runtime,
    changes: broadcast::Receiver<SignalChange>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = MockClock::at(start_time());
        let bus = Arc::new(SignalBus::new());
        let changes = bus.subscribe();
        let store = Arc::new(SignalStore::new(bus, Arc::new(clock.clone())));
        let registry = Arc::new(ServiceRegistry::new());
        let calls = Calls::default();

        for name in [NOTIFY, STOP, START, "notify/soulphone"] {
            let calls = calls.clone();
            let name_owned = name.to_string();
            registry.register(service(name), move |data| {
                let calls = calls.clone();
                let name = name_owned.clone();
                async move {
                    if calls.failing.lock().unwrap().contains(&name) {
                        return Err(ServiceError::CallFailed(format!("{name} offline")));
                    }
                    calls.log.lock().unwrap().push((name, data));
                    Ok(())
                }
            });
        }

        let runtime = Runtime::new(store.clone(), Arc::new(clock.clone()));

        Self {
            clock,
            store,
            registry,
            calls,
            runtime,
            changes,
        }
    }

    pub fn register(&mut self, monitor: Box<dyn Monitor>) {
        self.runtime.register(monitor);
    }

    /// Write a value without delivering the change (initial state)
    pub fn preset(&mut self, signal: &str, value: &str) {
        self.store.set(id(signal), value);
        while self.changes.try_recv().is_ok() {}
    }

    pub async fn start(&mut self) {
        self.runtime.start().await;
    }

    /// Write a value and deliver the resulting change to the runtime
    pub async fn set(&mut self, signal: &str, value: &str) {
        self.store.set(id(signal), value);
        while let Ok(change) = self.changes.try_recv() {
            self.runtime.handle_change(&change).await;
        }
    }

    pub fn value(&self, signal: &str) -> SignalValue {
        self.store
            .get(&id(signal))
            .map(|s| s.value)
            .unwrap_or(SignalValue::Unavailable)
    }

    /// Move the clock forward, firing every timer at its own deadline
    pub async fn advance(&mut self, seconds: i64) {
        let target = self.clock.now() + Duration::seconds(seconds);
        while let Some(deadline) = self.runtime.timers().next_deadline() {
            if deadline > target {
                break;
            }
            if deadline > self.clock.now() {
                self.clock.set(deadline);
            }
            self.runtime.fire_due_timers().await;
        }
        self.clock.set(target);
    }
}
