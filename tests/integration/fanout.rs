//! Fan-out semantics of a single hub
//!
//! - every member at snapshot time gets exactly one delivery
//! - removed subscribers stop receiving
//! - per-subscriber ordering is preserved

use live_sysmon::hub::{Mailbox, OverflowPolicy};
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn drain(mailbox: &mut Mailbox) -> Vec<String> {
    std::iter::from_fn(|| mailbox.try_dequeue())
        .map(|payload| payload.to_string())
        .collect()
}

#[tokio::test]
async fn test_three_subscribers_with_removal() {
    let hub = create_test_hub(10, OverflowPolicy::Disconnect);
    let mut first = hub.subscribe();
    let mut second = hub.subscribe();
    let mut third = hub.subscribe();

    let report = hub.broadcast("A").await;
    assert_eq!(report.recipients, 3);
    assert_eq!(report.queued, 3);

    assert!(hub.registry().remove(second.id()));

    let report = hub.broadcast("B").await;
    assert_eq!(report.recipients, 2);

    assert_eq!(drain(first.mailbox()), vec!["A", "B"]);
    assert_eq!(drain(second.mailbox()), vec!["A"]);
    assert_eq!(drain(third.mailbox()), vec!["A", "B"]);
}

#[tokio::test]
async fn test_late_joiner_never_sees_earlier_payload() {
    let hub = create_test_hub(10, OverflowPolicy::Disconnect);
    let mut early = hub.subscribe();

    hub.broadcast("first").await;
    let mut late = hub.subscribe();

    assert_eq!(drain(early.mailbox()), vec!["first"]);
    assert!(drain(late.mailbox()).is_empty());
}

#[tokio::test]
async fn test_order_is_preserved_per_subscriber() {
    let hub = create_test_hub(10, OverflowPolicy::Disconnect);
    let mut subscription = hub.subscribe();

    for payload in ["P1", "P2", "P3", "P4"] {
        hub.broadcast(payload).await;
    }

    assert_eq!(drain(subscription.mailbox()), vec!["P1", "P2", "P3", "P4"]);
}

#[tokio::test]
async fn test_broadcast_with_zero_subscribers_returns_immediately() {
    let hub = create_test_hub(10, OverflowPolicy::Disconnect);

    let started = tokio::time::Instant::now();
    for _ in 0..1_000 {
        let report = hub.broadcast("idle").await;
        assert_eq!(report.recipients, 0);
    }

    assert!(started.elapsed() < std::time::Duration::from_secs(1));
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_dropped_subscription_is_not_targeted() {
    let hub = create_test_hub(10, OverflowPolicy::Disconnect);
    let kept = hub.subscribe();
    let gone = hub.subscribe();
    drop(gone);

    let report = hub.broadcast("after").await;

    assert_eq!(report.recipients, 1);
    assert_eq!(report.queued, 1);
    assert_eq!(report.closed, 0);
    drop(kept);
}
