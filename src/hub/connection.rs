//! Per-connection delivery loop
//!
//! A [`ConnectionHandler`] binds one duplex connection to one subscriber. It
//! is registered as soon as it is constructed and serves until the first of:
//!
//! - the transport's read side closes (`read_closed` is cancelled),
//! - a write fails or exceeds the write deadline,
//! - the broadcaster evicts the subscriber,
//! - the hub shuts down.
//!
//! Whatever the exit path, the transport is closed (bounded by the write
//! deadline) and the subscriber is deregistered.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use super::subscriber::{Payload, SubscriberId};
use super::{Hub, Subscription};

/// Errors reported by a [`Transport`]
#[derive(Debug)]
pub enum TransportError {
    /// The peer is gone
    Closed,

    /// Writing a frame failed
    Send(Box<dyn StdError + Send + Sync>),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Closed => write!(f, "connection closed"),
            TransportError::Send(err) => write!(f, "failed to send frame: {}", err),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TransportError::Closed => None,
            TransportError::Send(err) => Some(err.as_ref()),
        }
    }
}

/// Write side of one duplex connection
#[async_trait]
pub trait Transport: Send {
    /// Send one payload as a single text frame.
    async fn send_text(&mut self, payload: Payload) -> Result<(), TransportError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Why a connection handler stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client closed the connection or the read side failed
    ReadClosed,

    /// Writing a payload failed
    WriteFailed,

    /// Writing a payload exceeded the write deadline
    WriteTimedOut,

    /// The broadcaster gave up on this subscriber
    Evicted,

    /// The hub is shutting down
    Shutdown,
}

/// Delivers one subscriber's mailbox onto its connection
pub struct ConnectionHandler<T> {
    transport: T,
    subscription: Subscription,
    read_closed: CancellationToken,
    shutdown: CancellationToken,
    write_timeout: Duration,
}

impl<T: Transport> ConnectionHandler<T> {
    /// Register a new subscriber for `transport`.
    ///
    /// `read_closed` must be cancelled by whoever watches the read side of
    /// the connection once it ends.
    pub fn new(hub: &Hub, transport: T, read_closed: CancellationToken) -> Self {
        Self {
            transport,
            subscription: hub.subscribe(),
            read_closed,
            shutdown: hub.shutdown_token(),
            write_timeout: hub.config().write_timeout(),
        }
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscription.id()
    }

    /// Serve until the connection ends, then release it.
    #[instrument(skip(self), fields(subscriber = %self.subscription.id()))]
    pub async fn run(mut self) -> CloseReason {
        let reason = self.serve().await;
        debug!(?reason, "closing connection");

        match timeout(self.write_timeout, self.transport.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => trace!("error while closing connection: {e}"),
            Err(_) => trace!("closing connection timed out"),
        }

        // dropping the subscription deregisters the subscriber
        drop(self.subscription);
        reason
    }

    async fn serve(&mut self) -> CloseReason {
        let evicted = self.subscription.subscriber().eviction_token();

        loop {
            let payload = tokio::select! {
                biased;

                _ = self.read_closed.cancelled() => return CloseReason::ReadClosed,
                _ = evicted.cancelled() => return CloseReason::Evicted,
                _ = self.shutdown.cancelled() => return CloseReason::Shutdown,

                next = self.subscription.mailbox().dequeue() => match next {
                    Some(payload) => payload,
                    None => return CloseReason::Evicted,
                },
            };

            let write = timeout(self.write_timeout, self.transport.send_text(payload));
            tokio::select! {
                biased;

                _ = self.read_closed.cancelled() => return CloseReason::ReadClosed,

                result = write => match result {
                    Ok(Ok(())) => trace!("payload delivered"),
                    Ok(Err(e)) => {
                        warn!("write failed: {e}");
                        return CloseReason::WriteFailed;
                    }
                    Err(_) => {
                        warn!("write exceeded {:?}", self.write_timeout);
                        return CloseReason::WriteTimedOut;
                    }
                },
            }
        }
    }
}
