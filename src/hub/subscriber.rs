//! Subscriber handles and their bounded mailboxes
//!
//! A subscriber is split in two halves: the cloneable [`Subscriber`] handle
//! that the registry and the broadcaster hold (producer side), and the
//! [`Mailbox`] that only the connection handler reads from (consumer side).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// One rendered update, shared by every mailbox it is delivered to.
pub type Payload = Arc<str>;

/// Hub-assigned identity of a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of a single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    /// The payload is in the mailbox
    Queued,

    /// The mailbox had no free slot (non-blocking attempt)
    Full,

    /// The mailbox stayed full for the whole wait (bounded attempt)
    TimedOut,

    /// The consumer is gone
    Closed,
}

struct Shared {
    id: SubscriberId,
    tx: mpsc::Sender<Payload>,
    dropped: AtomicU64,
    eviction: CancellationToken,
}

/// Producer-side handle of one connected client
#[derive(Clone)]
pub struct Subscriber {
    shared: Arc<Shared>,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.shared.id)
            .field("dropped", &self.dropped())
            .field("evicted", &self.is_evicted())
            .finish()
    }
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.shared.id
    }

    /// Place a payload without waiting.
    pub fn try_enqueue(&self, payload: Payload) -> Enqueue {
        match self.shared.tx.try_send(payload) {
            Ok(()) => Enqueue::Queued,
            Err(TrySendError::Full(_)) => Enqueue::Full,
            Err(TrySendError::Closed(_)) => Enqueue::Closed,
        }
    }

    /// Place a payload, waiting at most `timeout` for a free slot.
    pub async fn enqueue_timeout(&self, payload: Payload, timeout: Duration) -> Enqueue {
        match self.shared.tx.send_timeout(payload, timeout).await {
            Ok(()) => Enqueue::Queued,
            Err(SendTimeoutError::Timeout(_)) => Enqueue::TimedOut,
            Err(SendTimeoutError::Closed(_)) => Enqueue::Closed,
        }
    }

    /// Number of payloads this subscriber never received because its
    /// mailbox was full.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn record_drop(&self) {
        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Ask the connection handler to close this subscriber's connection.
    pub fn evict(&self) {
        self.shared.eviction.cancel();
    }

    pub fn is_evicted(&self) -> bool {
        self.shared.eviction.is_cancelled()
    }

    pub(crate) fn eviction_token(&self) -> CancellationToken {
        self.shared.eviction.clone()
    }

    /// Whether the consuming half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.shared.tx.is_closed()
    }
}

/// Consumer-side half of a subscriber
#[derive(Debug)]
pub struct Mailbox {
    id: SubscriberId,
    rx: mpsc::Receiver<Payload>,
}

impl Mailbox {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next payload in FIFO order, or `None` once every producer is gone.
    pub async fn dequeue(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    pub fn try_dequeue(&mut self) -> Option<Payload> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create both halves of a subscriber with a mailbox of `capacity` slots.
///
/// `capacity` must be at least 1; [`crate::config::HubConfig::validate`]
/// rejects anything smaller.
pub fn channel(id: SubscriberId, capacity: usize) -> (Subscriber, Mailbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let subscriber = Subscriber {
        shared: Arc::new(Shared {
            id,
            tx,
            dropped: AtomicU64::new(0),
            eviction: CancellationToken::new(),
        }),
    };
    (subscriber, Mailbox { id, rx })
}
