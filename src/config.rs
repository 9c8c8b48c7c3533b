use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::trace;

use crate::hub::OverflowPolicy;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "crate::util::get_default_addr")]
    pub bind_addr: SocketAddr,

    /// Directory served for every path that is not `/ws` or `/api/*`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: crate::util::get_default_addr(),
            static_dir: default_static_dir(),
            hub: HubConfig::default(),
            publisher: PublisherConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.hub.validate()?;
        self.publisher.validate()?;
        Ok(())
    }
}

/// Settings of the subscriber hub
#[derive(Debug, Clone, serde::Deserialize)]
pub struct HubConfig {
    /// Capacity of each subscriber's mailbox
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    /// Deadline for writing one payload to a connection
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// How long a broadcast waits on a full mailbox before giving up
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,

    #[serde(default)]
    pub overflow: OverflowPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
            write_timeout_ms: default_write_timeout_ms(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
            overflow: OverflowPolicy::default(),
        }
    }
}

impl HubConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.subscriber_buffer == 0 {
            bail!("hub.subscriber_buffer must be at least 1");
        }
        if self.write_timeout_ms == 0 {
            bail!("hub.write_timeout_ms must be greater than 0");
        }
        if self.enqueue_timeout_ms == 0 {
            bail!("hub.enqueue_timeout_ms must be greater than 0");
        }
        Ok(())
    }
}

/// Settings of the periodic metric publisher
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Path whose filesystem is reported in the disk section
    #[serde(default = "default_disk_path")]
    pub disk_path: PathBuf,

    /// chrono format string for the update timestamp
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            disk_path: default_disk_path(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

impl PublisherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_secs == 0 {
            bail!("publisher.interval_secs must be at least 1");
        }
        Ok(())
    }
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./htmx")
}

fn default_subscriber_buffer() -> usize {
    10
}

fn default_write_timeout_ms() -> u64 {
    1_000
}

fn default_enqueue_timeout_ms() -> u64 {
    100
}

fn default_interval_secs() -> u64 {
    3
}

fn default_disk_path() -> PathBuf {
    PathBuf::from("/")
}

fn default_timestamp_format() -> String {
    String::from("%d-%m-%Y %H:%M:%S")
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let config: Config = serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
