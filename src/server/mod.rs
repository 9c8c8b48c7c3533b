//! HTTP and WebSocket server
//!
//! ## Endpoints
//!
//! - `GET /ws` - WebSocket upgrade, streams every broadcast payload
//! - `GET /api/health` - Health check with the current subscriber count
//! - everything else - static files from the configured directory

pub mod health;
pub mod websocket;

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use axum::{Router, routing::get};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::Config;
use crate::hub::Hub;

/// Shared state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,

    /// Upgraded WebSocket connections, which outlive their HTTP request
    pub connections: TaskTracker,
}

impl AppState {
    pub fn new(hub: Hub) -> Self {
        Self {
            hub,
            connections: TaskTracker::new(),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    if !static_dir.exists() {
        info!("static directory {} not found", static_dir.display());
    }

    Router::new()
        .route("/ws", get(websocket::websocket_handler))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
}

/// Spawn the server
///
/// This binds the listener, starts serving in a background task and returns
/// the bound address together with the task. The server stops accepting
/// requests once the hub is shut down; the task finishes after every open
/// WebSocket connection has been closed.
pub async fn spawn_server(
    config: &Config,
    hub: Hub,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    info!("starting server on {}", config.bind_addr);

    let shutdown = hub.shutdown_token();
    let state = AppState::new(hub);
    let connections = state.connections.clone();
    let app = router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr()?;

    info!("server listening on {}", addr);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
        {
            tracing::error!("server error: {}", e);
        }

        connections.close();
        debug!("waiting for {} connection(s) to close", connections.len());
        connections.wait().await;
        info!("server stopped");
    });

    Ok((addr, server))
}
