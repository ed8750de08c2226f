mod common;

use common::{id, service, Harness, NOTIFY};
use rules_engine::evaluator::ThresholdConfig;
use rules_engine::{Phase, PhaseCurrentAlert};
use rules_notify::{ServiceMessenger, ThrottledNotifier};
use std::sync::Arc;
use std::time::Duration;

const L1: &str = "sensor.pillanatnyi_aramerosseg_l1";
const L2: &str = "sensor.pillanatnyi_aramerosseg_l2";
const L3: &str = "sensor.pillanatnyi_aramerosseg_l3";

fn alert(h: &Harness, check_interval: u64) -> PhaseCurrentAlert {
    let phases = vec![
        Phase::new("L1", id(L1), ThresholdConfig::limit(16.0)),
        Phase::new("L2", id(L2), ThresholdConfig::limit(16.0)),
        Phase::new("L3", id(L3), ThresholdConfig::limit(32.0)),
    ];
    let messenger = Arc::new(ServiceMessenger::new(h.registry.clone(), service(NOTIFY)));
    let notifier = ThrottledNotifier::new(messenger, Duration::from_secs(60));
    PhaseCurrentAlert::new(phases, notifier, Duration::from_secs(check_interval))
}

async fn started(check_interval: u64) -> Harness {
    let mut h = Harness::new();
    h.preset(L1, "5");
    h.preset(L2, "5");
    h.preset(L3, "5");
    let monitor = alert(&h, check_interval);
    h.register(Box::new(monitor));
    h.start().await;
    h
}

#[tokio::test]
async fn test_exceeded_phase_notifies_with_escaped_text() {
    let mut h = started(3600).await;

    h.set(L1, "17.23").await;

    let messages = h.calls.messages(NOTIFY);
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0],
        "⚠️ High Current Alert: L1 is at 17\\.2A \\(threshold: 16\\.0A\\)\\. \
         Please reduce load to avoid tripping the breaker\\."
    );
}

#[tokio::test]
async fn test_limit_is_inclusive_and_below_is_silent() {
    let mut h = started(3600).await;

    h.set(L3, "31.9").await;
    assert!(h.calls.messages(NOTIFY).is_empty());

    h.set(L3, "32").await;
    assert_eq!(h.calls.messages(NOTIFY).len(), 1);
}

#[tokio::test]
async fn test_throttled_per_phase() {
    let mut h = started(3600).await;

    h.set(L1, "17").await;
    h.advance(30).await;
    h.set(L1, "18").await;
    assert_eq!(h.calls.messages(NOTIFY).len(), 1);

    // Another phase has its own throttle bucket
    h.set(L2, "20").await;
    assert_eq!(h.calls.messages(NOTIFY).len(), 2);

    h.advance(31).await;
    h.set(L1, "19").await;
    assert_eq!(h.calls.messages(NOTIFY).len(), 3);
}

#[tokio::test]
async fn test_unavailable_phase_is_skipped() {
    let mut h = started(3600).await;

    h.set(L1, "unavailable").await;
    h.set(L2, "garbage").await;
    assert!(h.calls.messages(NOTIFY).is_empty());

    h.set(L3, "40").await;
    assert_eq!(h.calls.messages(NOTIFY).len(), 1);
}

#[tokio::test]
async fn test_poll_evaluates_every_phase() {
    let mut h = Harness::new();
    h.preset(L1, "20");
    h.preset(L2, "unavailable");
    h.preset(L3, "40");
    let monitor = alert(&h, 300);
    h.register(Box::new(monitor));

    // First poll happens at start
    h.start().await;
    assert_eq!(h.calls.messages(NOTIFY).len(), 2);

    // Values never changed, the poll still reports them
    h.advance(300).await;
    assert_eq!(h.calls.messages(NOTIFY).len(), 4);
}

#[tokio::test]
async fn test_failed_send_is_retried_on_next_event() {
    let mut h = started(3600).await;

    h.calls.set_failing(NOTIFY, true);
    h.set(L1, "17").await;
    assert!(h.calls.messages(NOTIFY).is_empty());

    h.calls.set_failing(NOTIFY, false);
    h.advance(1).await;
    h.set(L1, "17.5").await;
    assert_eq!(h.calls.messages(NOTIFY).len(), 1);
}
