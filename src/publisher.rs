//! Publisher - periodically renders host metrics and broadcasts them
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → run collectors → render payload → Hub::broadcast → [mailboxes]
//!     ↑
//!     └─── Commands (PublishNow, Shutdown)
//! ```
//!
//! The publisher is the only producer of payloads. A failing collector only
//! blanks its own section in that tick's payload.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::config::PublisherConfig;
use crate::hardware::{Collector, Section, render_payload};
use crate::hub::{BroadcastReport, Hub};

/// Commands that can be sent to a running [`Publisher`]
#[derive(Debug)]
pub enum PublisherCommand {
    /// Publish immediately, bypassing the interval timer
    PublishNow {
        respond_to: oneshot::Sender<BroadcastReport>,
    },

    /// Stop the publisher
    Shutdown,
}

/// Actor driving the periodic broadcast
pub struct Publisher {
    hub: Hub,
    collectors: Vec<Box<dyn Collector>>,
    command_rx: mpsc::Receiver<PublisherCommand>,
    interval_duration: Duration,
    timestamp_format: String,
    shutdown: CancellationToken,
}

impl Publisher {
    pub fn new(
        hub: Hub,
        collectors: Vec<Box<dyn Collector>>,
        config: &PublisherConfig,
        command_rx: mpsc::Receiver<PublisherCommand>,
    ) -> Self {
        Self {
            shutdown: hub.shutdown_token(),
            hub,
            collectors,
            command_rx,
            interval_duration: config.interval(),
            timestamp_format: config.timestamp_format.clone(),
        }
    }

    /// Run until shut down, the hub shuts down or every handle is dropped.
    #[instrument(skip(self), fields(interval = ?self.interval_duration))]
    pub async fn run(mut self) {
        debug!("starting publisher");

        let mut ticker = interval(self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("hub shut down");
                    break;
                }

                _ = ticker.tick() => {
                    self.publish().await;
                }

                cmd = self.command_rx.recv() => match cmd {
                    Some(PublisherCommand::PublishNow { respond_to }) => {
                        debug!("received PublishNow command");
                        let report = self.publish().await;
                        let _ = respond_to.send(report);
                    }
                    Some(PublisherCommand::Shutdown) => {
                        debug!("received shutdown command");
                        break;
                    }
                    None => {
                        debug!("all publisher handles dropped");
                        break;
                    }
                },
            }
        }

        debug!("publisher stopped");
    }

    /// Collect, render and broadcast one payload.
    ///
    /// Skipped entirely while nobody is subscribed.
    async fn publish(&self) -> BroadcastReport {
        if self.hub.subscriber_count() == 0 {
            trace!("no subscribers, skipping tick");
            return BroadcastReport::default();
        }

        let sections = self.collect_sections().await;
        let timestamp = Local::now().format(&self.timestamp_format).to_string();
        let payload = render_payload(&timestamp, &sections);

        let report = self.hub.broadcast(payload).await;
        trace!(
            sections = sections.len(),
            recipients = report.recipients,
            "published payload"
        );
        report
    }

    async fn collect_sections(&self) -> Vec<Section> {
        let results = join_all(self.collectors.iter().map(|collector| async move {
            (collector.target(), collector.collect().await)
        }))
        .await;

        results
            .into_iter()
            .map(|(target, result)| match result {
                Ok(html) => Section::new(target, html),
                Err(e) => {
                    // an empty swap clears the previous value in the browser
                    warn!("collector {target} failed: {e:#}");
                    Section::new(target, String::new())
                }
            })
            .collect()
    }
}

/// Handle for controlling a [`Publisher`]
#[derive(Clone)]
pub struct PublisherHandle {
    sender: mpsc::Sender<PublisherCommand>,
}

impl PublisherHandle {
    /// Spawn a publisher broadcasting on `hub`.
    ///
    /// Fails if `config` does not validate.
    pub fn spawn(
        hub: Hub,
        collectors: Vec<Box<dyn Collector>>,
        config: &PublisherConfig,
    ) -> Result<Self> {
        config.validate()?;

        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let publisher = Publisher::new(hub, collectors, config, cmd_rx);

        tokio::spawn(publisher.run());

        Ok(Self { sender: cmd_tx })
    }

    /// Publish immediately and return the broadcast outcome.
    pub async fn publish_now(&self) -> Result<BroadcastReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PublisherCommand::PublishNow { respond_to: tx })
            .await
            .context("failed to send PublishNow command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(PublisherCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
