//! Helper functions for integration tests

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use live_sysmon::{
    config::{Config, HubConfig},
    hardware::Collector,
    hub::{Hub, OverflowPolicy},
    server::spawn_server,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn create_test_hub(buffer: usize, overflow: OverflowPolicy) -> Hub {
    Hub::new(HubConfig {
        subscriber_buffer: buffer,
        write_timeout_ms: 500,
        enqueue_timeout_ms: 50,
        overflow,
    })
}

/// Start a server on a random local port.
pub async fn spawn_test_server(hub: Hub, static_dir: &Path) -> SocketAddr {
    let config = Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        static_dir: static_dir.to_path_buf(),
        ..Config::default()
    };

    let (addr, _server) = spawn_server(&config, hub).await.unwrap();
    addr
}

pub async fn connect_client(addr: SocketAddr) -> WsClient {
    let (client, _response) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

/// Wait until the hub has exactly `count` subscribers.
pub async fn wait_for_subscribers(hub: &Hub, count: usize) {
    let reached = tokio::time::timeout(Duration::from_secs(2), async {
        while hub.subscriber_count() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(
        reached.is_ok(),
        "expected {count} subscribers, have {}",
        hub.subscriber_count()
    );
}

/// Collector returning fixed HTML
pub struct FixedCollector {
    pub target: &'static str,
    pub html: &'static str,
}

#[async_trait]
impl Collector for FixedCollector {
    fn target(&self) -> &'static str {
        self.target
    }

    async fn collect(&self) -> anyhow::Result<String> {
        Ok(self.html.to_string())
    }
}
