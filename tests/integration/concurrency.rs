//! Concurrent membership changes racing with broadcasts

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use live_sysmon::hub::OverflowPolicy;

use crate::helpers::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_churn_during_broadcasts() {
    let hub = create_test_hub(4, OverflowPolicy::DropNewest);
    let stop = Arc::new(AtomicBool::new(false));

    let publisher = {
        let hub = hub.clone();
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            let mut broadcasts = 0usize;
            while !stop.load(Ordering::SeqCst) {
                hub.broadcast("tick").await;
                broadcasts += 1;
                tokio::task::yield_now().await;
            }
            broadcasts
        })
    };

    let mut churners = Vec::new();
    for _ in 0..8 {
        let hub = hub.clone();
        churners.push(tokio::spawn(async move {
            for _ in 0..50 {
                let mut subscription = hub.subscribe();
                tokio::task::yield_now().await;
                while subscription.mailbox().try_dequeue().is_some() {}
            }
        }));
    }

    for churner in churners {
        churner.await.unwrap();
    }
    stop.store(true, Ordering::SeqCst);

    let broadcasts = publisher.await.unwrap();
    assert!(broadcasts > 0);
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consumers_each_get_every_payload() {
    let hub = create_test_hub(16, OverflowPolicy::Disconnect);

    let consumers: Vec<_> = (0..10)
        .map(|_| {
            let mut subscription = hub.subscribe();
            tokio::spawn(async move {
                let mut received = Vec::new();
                while received.len() < 5 {
                    match subscription.mailbox().dequeue().await {
                        Some(payload) => received.push(payload.to_string()),
                        None => break,
                    }
                }
                received
            })
        })
        .collect();

    for i in 0..5 {
        let report = hub.broadcast(format!("P{i}")).await;
        assert_eq!(report.recipients, 10);
    }

    for consumer in consumers {
        let received = tokio::time::timeout(Duration::from_secs(2), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, vec!["P0", "P1", "P2", "P3", "P4"]);
    }
}
