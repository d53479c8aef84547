//! Per-connection WebSocket loop.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::RelayState;
use crate::websocket::connection::ClientConnection;
use crate::websocket::handler::handle_frame;

/// Outbound queue depth per connection. A client that falls this far
/// behind starts losing frames rather than stalling the session.
const SEND_QUEUE: usize = 256;

/// Ping cadence.
const PING_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Drive one WebSocket connection to completion.
///
/// Spawns an outbound pump for queued frames and pings, then reads
/// inbound frames until the client disconnects, a liveness check fails,
/// or shutdown begins. Always unbinds the connection on exit.
pub async fn run_ws_session(
    socket: WebSocket,
    conn_id: String,
    state: Arc<RelayState>,
    shutdown: tokio_util::sync::CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<String>>(SEND_QUEUE);
    let conn = Arc::new(ClientConnection::new(conn_id, tx));

    state.connection_opened();
    info!(conn_id = %conn.id, "websocket connected");

    let pump_conn = Arc::clone(&conn);
    let pump_shutdown = shutdown.clone();
    let mut outbound = tokio::spawn(async move {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        let _ = ping.tick().await;
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let Some(text) = maybe else { break };
                    if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if !pump_conn.check_alive() {
                        warn!(conn_id = %pump_conn.id, "no pong since last ping, closing");
                        break;
                    }
                    if ws_tx.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                        break;
                    }
                }
                () = pump_shutdown.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            maybe = ws_rx.next() => {
                let Some(Ok(message)) = maybe else { break };
                match message {
                    Message::Text(text) => {
                        conn.mark_alive();
                        handle_frame(text.as_str(), &conn, &state).await;
                    }
                    Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                        Ok(text) => {
                            conn.mark_alive();
                            handle_frame(text, &conn, &state).await;
                        }
                        Err(_) => {
                            debug!(conn_id = %conn.id, "ignoring non-utf8 binary frame");
                        }
                    },
                    Message::Ping(_) | Message::Pong(_) => conn.mark_alive(),
                    Message::Close(_) => break,
                }
            }
            _ = &mut outbound => break,
        }
    }

    state.registry.unbind(&conn);
    state.connection_closed();
    outbound.abort();
    info!(
        conn_id = %conn.id,
        dropped = conn.drop_count(),
        "websocket disconnected"
    );
}
