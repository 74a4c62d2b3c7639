//! Inbound message dispatch and payload forwarding.
//!
//! Delivery is best-effort and at-most-once: a forward whose target seat is
//! empty or closed is dropped without telling the sender.

use serde_json::Value;
use tether_common::{ConnectionId, RelayError};

use crate::protocol::{Inbound, PayloadKind, ServerMessage};
use crate::store::{Registries, RelayStore};

impl Registries {
    /// Forward `data` from `from` to the opposite seat of its session.
    ///
    /// Routing uses the sender's own binding, never a session id carried in
    /// the payload.
    pub fn relay(
        &self,
        from: &ConnectionId,
        kind: PayloadKind,
        data: Option<Value>,
    ) -> Result<(), RelayError> {
        let binding = self
            .connections
            .get(from)
            .and_then(|c| c.binding.as_ref())
            .ok_or(RelayError::PeerUnavailable)?;

        let target = kind.target();
        if binding.role == target {
            return Err(RelayError::PeerUnavailable);
        }

        let seat = self
            .sessions
            .get(&binding.session)
            .and_then(|s| s.seat(target))
            .ok_or(RelayError::PeerUnavailable)?;

        if !seat.outbound.is_open() {
            return Err(RelayError::PeerUnavailable);
        }
        seat.outbound.deliver(kind.into_message(data))
    }
}

/// Handle one raw inbound frame from `conn`.
///
/// Errors go back to the sender only; nothing here closes the connection.
pub async fn dispatch(store: &RelayStore, conn: &ConnectionId, raw: &str) {
    let msg = match Inbound::parse(raw) {
        Ok(msg) => msg,
        Err(e) => {
            if let RelayError::MalformedMessage(detail) = &e {
                tracing::warn!(conn = %conn, error = %detail, "Invalid message format");
            }
            store.send_to(conn, ServerMessage::error(&e)).await;
            return;
        }
    };

    match msg {
        Inbound::Attach { role, session_id } => {
            if let Err(e) = store.attach(conn, &session_id, role).await {
                tracing::debug!(
                    conn = %conn,
                    session = %session_id,
                    role = ?role,
                    error = %e,
                    "Attach rejected"
                );
                store.send_to(conn, ServerMessage::error(&e)).await;
            }
        }
        Inbound::Forward { kind, data } => {
            if store.relay(conn, kind, data).await.is_err() {
                tracing::trace!(conn = %conn, kind = ?kind, "Relay target unavailable, dropped");
            }
        }
        Inbound::Ping => {
            store.send_to(conn, ServerMessage::Pong).await;
        }
        Inbound::Unknown(msg_type) => {
            tracing::debug!(conn = %conn, msg_type = %msg_type, "Unknown message type");
        }
    }
}
