//! WebSocket transport for the signaling channel.
//!
//! One socket task per connection. The task owns both directions: a
//! `tokio::select!` loop pumps the connection's outbound channel into the
//! socket and forwards inbound frames to the coordinator, which preserves
//! per-connection ordering in both directions. When the socket closes (or
//! errors), the task tells the coordinator to detach the connection - that
//! is the disconnect signal of the protocol.

use crate::actors::CoordinatorHandle;
use crate::protocol::{ClientEvent, ServerEvent};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Create the signaling router (`GET /ws` upgrade endpoint).
pub fn signaling_router(handle: CoordinatorHandle) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(handle)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(handle): State<CoordinatorHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, handle))
}

/// Drive one WebSocket connection until it closes.
async fn run_connection(mut socket: WebSocket, handle: CoordinatorHandle) {
    let connection_id = Uuid::new_v4().to_string();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    if handle.attach(connection_id.clone(), tx).await.is_err() {
        // Coordinator is shutting down; nothing to serve.
        return;
    }

    debug!(
        target: "signal.server",
        connection_id = %connection_id,
        "Connection established"
    );

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(event) = outbound else {
                    // Coordinator dropped our channel.
                    break;
                };
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(
                            target: "signal.server",
                            connection_id = %connection_id,
                            error = %e,
                            "Failed to serialize outbound event"
                        );
                    }
                }
            }

            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => {
                                if handle.inbound(connection_id.clone(), event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                debug!(
                                    target: "signal.server",
                                    connection_id = %connection_id,
                                    error = %e,
                                    "Discarding malformed frame"
                                );
                                let error = ServerEvent::CallError {
                                    reason: "missing-argument".to_string(),
                                    message: "malformed message".to_string(),
                                };
                                if let Ok(text) = serde_json::to_string(&error) {
                                    let _ = socket.send(Message::Text(text)).await;
                                }
                            }
                        }
                    }
                    // Pings are answered by the protocol layer; binary
                    // frames have no meaning on this channel.
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_))) => {}
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                }
            }
        }
    }

    // Transport-signaled disconnect: presence cleanup and call purge
    // happen in the coordinator.
    let _ = handle.detach(connection_id.clone()).await;
    debug!(
        target: "signal.server",
        connection_id = %connection_id,
        "Connection closed"
    );
}
