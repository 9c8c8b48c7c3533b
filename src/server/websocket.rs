//! WebSocket endpoint streaming broadcast payloads to browsers

use async_trait::async_trait;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{
    SinkExt,
    stream::{SplitSink, Stream, StreamExt},
};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info, trace};

use crate::hub::{ConnectionHandler, Hub, Payload, Transport, TransportError};

use super::AppState;

/// WebSocket upgrade handler
///
/// GET /ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let AppState { hub, connections } = state;
    ws.on_upgrade(move |socket| connections.track_future(handle_websocket(socket, hub)))
}

/// Write half of an upgraded WebSocket
struct WsTransport {
    sender: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, payload: Payload) -> Result<(), TransportError> {
        self.sender
            .send(Message::Text(payload.to_string()))
            .await
            .map_err(|e| TransportError::Send(Box::new(e)))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sender
            .close()
            .await
            .map_err(|e| TransportError::Send(Box::new(e)))
    }
}

/// Handle one WebSocket connection until it closes.
async fn handle_websocket(socket: WebSocket, hub: Hub) {
    let (sender, receiver) = socket.split();
    serve_connection(&hub, WsTransport { sender }, receiver).await;
}

/// Deliver payloads on `transport` while watching `receiver` for the end of
/// the connection.
async fn serve_connection<T, S>(hub: &Hub, transport: T, mut receiver: S)
where
    T: Transport,
    S: Stream<Item = Result<Message, axum::Error>> + Send + Unpin + 'static,
{
    let read_closed = CancellationToken::new();

    let handler = ConnectionHandler::new(hub, transport, read_closed.clone());
    let subscriber = handler.subscriber_id();
    info!(%subscriber, "WebSocket client connected");

    // Client frames carry no meaning; the read side is only watched so a
    // closed connection is noticed. The guard cancels on every exit, and the
    // task is aborted on drop so the read half never outlives the handler.
    let reader = AbortOnDropHandle::new(tokio::spawn(async move {
        let _closed = read_closed.drop_guard();
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                _ => trace!(%subscriber, "ignoring client frame"),
            }
        }
        debug!(%subscriber, "read side closed");
    }));

    let reason = handler.run().await;
    drop(reader);

    info!(%subscriber, ?reason, "WebSocket client disconnected");
}
