//! Slow subscribers must not hold up healthy ones

use std::time::Duration;

use live_sysmon::hub::OverflowPolicy;

use crate::helpers::*;

#[tokio::test]
async fn test_stuck_subscriber_does_not_block_healthy_one() {
    let hub = create_test_hub(2, OverflowPolicy::Disconnect);
    let stuck = hub.subscribe();
    let mut healthy = hub.subscribe();

    let consumer = tokio::spawn(async move {
        let mut received = Vec::new();
        while received.len() < 10 {
            match healthy.mailbox().dequeue().await {
                Some(payload) => received.push(payload.to_string()),
                None => break,
            }
        }
        received
    });

    let started = tokio::time::Instant::now();
    for i in 0..10 {
        hub.broadcast(format!("tick-{i}")).await;
    }
    let elapsed = started.elapsed();

    let received = tokio::time::timeout(Duration::from_secs(2), consumer)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(received.len(), 10);
    assert_eq!(received.first().map(String::as_str), Some("tick-0"));
    assert_eq!(received.last().map(String::as_str), Some("tick-9"));

    // the stuck subscriber costs at most one enqueue timeout before eviction
    assert!(elapsed < Duration::from_secs(1), "broadcasts took {elapsed:?}");
    assert!(stuck.subscriber().is_evicted());
    assert!(!hub.registry().contains(stuck.id()));
}

#[tokio::test]
async fn test_drop_newest_counts_dropped_payloads() {
    let hub = create_test_hub(2, OverflowPolicy::DropNewest);
    let mut slow = hub.subscribe();

    let mut dropped = 0;
    for i in 0..5 {
        dropped += hub.broadcast(format!("tick-{i}")).await.dropped;
    }

    assert_eq!(dropped, 3);
    assert_eq!(slow.subscriber().dropped(), 3);
    assert!(hub.registry().contains(slow.id()));

    // the oldest payloads are the ones kept
    assert_eq!(slow.mailbox().try_dequeue().as_deref(), Some("tick-0"));
    assert_eq!(slow.mailbox().try_dequeue().as_deref(), Some("tick-1"));
    assert!(slow.mailbox().try_dequeue().is_none());
}

#[tokio::test]
async fn test_evicted_subscriber_gets_no_further_attempts() {
    let hub = create_test_hub(1, OverflowPolicy::Disconnect);
    let _stuck = hub.subscribe();

    hub.broadcast("fill").await;
    let report = hub.broadcast("overflow").await;
    assert_eq!(report.evicted, 1);

    let report = hub.broadcast("after eviction").await;
    assert_eq!(report.recipients, 0);
}
