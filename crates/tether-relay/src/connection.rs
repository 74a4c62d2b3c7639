//! Per-connection task: register, dispatch inbound frames, drain the outbound
//! queue, and run the disconnect handler exactly once on the way out.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tether_common::RelayError;
use tether_config::ConnectionConfig;

use crate::dispatch::dispatch;
use crate::protocol::ServerMessage;
use crate::store::RelayStore;

/// Drive a single upgraded WebSocket until it closes.
pub async fn handle_connection(
    ws: WebSocket,
    addr: SocketAddr,
    store: RelayStore,
    settings: ConnectionConfig,
) {
    let (mut sink, mut stream) = ws.split();

    // 1. Register and greet.
    let (conn_id, mut rx) = store.register_connection(addr).await;
    tracing::info!(peer = %addr, conn = %conn_id, "Client connected");

    if send_message(&mut sink, &ServerMessage::connected(conn_id.clone()))
        .await
        .is_err()
    {
        store.disconnect(&conn_id).await;
        return;
    }

    let idle_timeout = settings.idle_timeout();
    let mut heartbeat = tokio::time::interval(settings.heartbeat_interval());
    heartbeat.tick().await; // first tick is immediate
    let mut last_seen = Instant::now();

    // 2. Forwarding loop.
    loop {
        tokio::select! {
            // Queued messages for this connection → its WebSocket
            Some(msg) = rx.recv() => {
                if send_message(&mut sink, &msg).await.is_err() {
                    break;
                }
            }

            // Frames from this connection → dispatcher
            frame = stream.next() => {
                last_seen = Instant::now();
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(&store, &conn_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => dispatch(&store, &conn_id, text).await,
                        Err(_) => {
                            tracing::warn!(peer = %addr, "Binary frame is not UTF-8");
                            let err = RelayError::MalformedMessage("binary frame".into());
                            store.send_to(&conn_id, ServerMessage::error(&err)).await;
                        }
                    },
                    // axum answers pings itself; pongs only refresh `last_seen`.
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if last_seen.elapsed() > idle_timeout {
                    tracing::warn!(peer = %addr, conn = %conn_id, "Heartbeat timeout");
                    break;
                }
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    // 3. Cleanup. Covers graceful close, transport error and timeout alike.
    let outcome = store.disconnect(&conn_id).await;
    tracing::debug!(peer = %addr, conn = %conn_id, outcome = ?outcome, "Connection closed");
}

/// Send a ServerMessage as a JSON text frame.
async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize outbound message");
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await
}
