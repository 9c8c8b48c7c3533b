//! Fan-out of one payload to every registered subscriber

use futures::future::join_all;
use tracing::{instrument, trace, warn};

use super::Hub;
use super::subscriber::{Enqueue, Payload, Subscriber};

/// What a broadcast does with a subscriber whose mailbox is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait up to the enqueue timeout for a free slot, then drop the payload
    /// and evict the subscriber.
    #[default]
    Disconnect,

    /// Drop the payload immediately and keep the subscriber.
    DropNewest,
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members in the snapshot, i.e. delivery attempts made
    pub recipients: usize,

    /// Payloads placed in a mailbox
    pub queued: usize,

    /// Payloads dropped because a mailbox was full
    pub dropped: usize,

    /// Subscribers removed for being unresponsive
    pub evicted: usize,

    /// Subscribers whose handler was already gone
    pub closed: usize,
}

impl Hub {
    /// Deliver `payload` to every subscriber registered at the time of the
    /// call.
    ///
    /// Each member gets exactly one delivery attempt. Healthy mailboxes are
    /// served without waiting; full ones are handled per [`OverflowPolicy`],
    /// so a stuck subscriber delays the broadcast by at most the enqueue
    /// timeout.
    #[instrument(skip_all)]
    pub async fn broadcast(&self, payload: impl Into<Payload>) -> BroadcastReport {
        let members = self.registry().snapshot();
        let mut report = BroadcastReport {
            recipients: members.len(),
            ..BroadcastReport::default()
        };

        if members.is_empty() {
            trace!("no subscribers, nothing to broadcast");
            return report;
        }

        let payload = payload.into();
        let mut backlogged = Vec::new();

        for subscriber in members {
            match subscriber.try_enqueue(Payload::clone(&payload)) {
                Enqueue::Queued => report.queued += 1,
                Enqueue::Full => match self.config().overflow {
                    OverflowPolicy::DropNewest => {
                        subscriber.record_drop();
                        report.dropped += 1;
                        trace!(subscriber = %subscriber.id(), "mailbox full, payload dropped");
                    }
                    OverflowPolicy::Disconnect => backlogged.push(subscriber),
                },
                Enqueue::Closed | Enqueue::TimedOut => self.discard_closed(&subscriber, &mut report),
            }
        }

        if !backlogged.is_empty() {
            self.deliver_backlogged(backlogged, &payload, &mut report)
                .await;
        }

        trace!(
            recipients = report.recipients,
            queued = report.queued,
            dropped = report.dropped,
            evicted = report.evicted,
            "broadcast finished"
        );

        report
    }

    /// Wait concurrently for every full mailbox, evicting the ones that stay
    /// full past the enqueue timeout.
    async fn deliver_backlogged(
        &self,
        backlogged: Vec<Subscriber>,
        payload: &Payload,
        report: &mut BroadcastReport,
    ) {
        let timeout = self.config().enqueue_timeout();
        let attempts = backlogged.into_iter().map(|subscriber| {
            let payload = Payload::clone(payload);
            async move {
                let outcome = subscriber.enqueue_timeout(payload, timeout).await;
                (subscriber, outcome)
            }
        });

        for (subscriber, outcome) in join_all(attempts).await {
            match outcome {
                Enqueue::Queued => report.queued += 1,
                Enqueue::Full | Enqueue::TimedOut => {
                    subscriber.record_drop();
                    report.dropped += 1;
                    report.evicted += 1;
                    warn!(
                        subscriber = %subscriber.id(),
                        "mailbox stayed full for {timeout:?}, evicting subscriber"
                    );
                    self.evict(&subscriber);
                }
                Enqueue::Closed => self.discard_closed(&subscriber, report),
            }
        }
    }

    fn discard_closed(&self, subscriber: &Subscriber, report: &mut BroadcastReport) {
        report.closed += 1;
        if self.registry().remove(subscriber.id()) {
            trace!(subscriber = %subscriber.id(), "removed subscriber with closed mailbox");
        }
    }
}
