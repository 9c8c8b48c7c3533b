//! Publish/subscribe hub fanning rendered payloads out to live connections
//!
//! ## Architecture
//!
//! ```text
//!   Publisher (timer tick)
//!         │ broadcast(payload)
//!         ▼
//!   ┌───────────┐  snapshot   ┌──────────┐
//!   │    Hub    │────────────▶│ Registry │  Mutex<HashMap<SubscriberId, Subscriber>>
//!   └─────┬─────┘             └──────────┘
//!         │ try_enqueue / enqueue_timeout (one attempt per member)
//!         ▼
//!   ┌─────────┐ ┌─────────┐ ┌─────────┐
//!   │ Mailbox │ │ Mailbox │ │ Mailbox │   bounded mpsc, one per subscriber
//!   └────┬────┘ └────┬────┘ └────┬────┘
//!        ▼           ▼           ▼
//!   ConnectionHandler (one task per connection, writes with a deadline)
//! ```
//!
//! The hub is an explicit value: cloning it is cheap and every clone refers
//! to the same registry. Independent hubs never share state.

pub mod broadcast;
pub mod connection;
pub mod registry;
pub mod subscriber;

pub use broadcast::{BroadcastReport, OverflowPolicy};
pub use connection::{CloseReason, ConnectionHandler, Transport, TransportError};
pub use registry::Registry;
pub use subscriber::{Enqueue, Mailbox, Payload, Subscriber, SubscriberId};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::HubConfig;

struct HubInner {
    registry: Registry,
    config: HubConfig,
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

/// Shared handle to one subscriber hub
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                registry: Registry::new(),
                config,
                next_id: AtomicU64::new(1),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Register a new subscriber.
    ///
    /// The subscriber receives every payload broadcast from now on until the
    /// returned [`Subscription`] is dropped.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (subscriber, mailbox) =
            subscriber::channel(id, self.inner.config.subscriber_buffer);

        self.inner.registry.add(subscriber.clone());
        debug!(subscriber = %id, "subscriber registered");

        Subscription {
            hub: self.clone(),
            subscriber,
            mailbox,
        }
    }

    /// Remove a subscriber from the registry and tell its handler to close.
    pub fn evict(&self, subscriber: &Subscriber) {
        self.inner.registry.remove(subscriber.id());
        subscriber.evict();
    }

    /// Signal every connection handler and the publisher to stop.
    pub fn shutdown(&self) {
        debug!("hub shutdown requested");
        self.inner.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }
}

/// Registration of one subscriber, owning its mailbox
///
/// Dropping the subscription removes the subscriber from the registry, so
/// membership ends on every exit path of the owning handler.
#[derive(Debug)]
pub struct Subscription {
    hub: Hub,
    subscriber: Subscriber,
    mailbox: Mailbox,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    pub fn mailbox(&mut self) -> &mut Mailbox {
        &mut self.mailbox
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.hub.inner.registry.remove(self.subscriber.id()) {
            debug!(subscriber = %self.subscriber.id(), "subscriber deregistered");
        }
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("subscribers", &self.subscriber_count())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
