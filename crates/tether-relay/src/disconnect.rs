//! Disconnect handling: runs once per connection when its transport closes.

use tether_common::{ConnectionId, Role, SessionId};

use crate::protocol::ServerMessage;
use crate::store::Registries;

/// What tearing down a connection did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detached {
    /// Not in the registry (already cleaned up).
    Unknown,
    /// Never claimed a role; only the registry entry was removed.
    Unpaired,
    Left {
        session: SessionId,
        role: Role,
        peer_notified: bool,
        session_deleted: bool,
    },
}

impl Registries {
    /// Vacate the connection's seat, tell the surviving peer, drop the
    /// session if it is now empty, and forget the connection.
    ///
    /// All of it happens under the caller's write lock.
    pub fn detach(&mut self, conn_id: &ConnectionId) -> Detached {
        let Some(conn) = self.connections.remove(conn_id) else {
            return Detached::Unknown;
        };
        let connected_for = conn.connected_at.elapsed();
        let Some(binding) = conn.binding else {
            tracing::debug!(conn = %conn_id, ?connected_for, "Unpaired connection closed");
            return Detached::Unpaired;
        };

        let Some(session) = self.sessions.get_mut(&binding.session) else {
            // Binding outlived its session; only possible if an earlier
            // delete skipped unbinding.
            tracing::warn!(conn = %conn_id, session = %binding.session, "Bound to missing session");
            return Detached::Unpaired;
        };

        let seat = session.seat_mut(binding.role);
        if seat.as_ref().is_some_and(|s| &s.conn == conn_id) {
            *seat = None;
        }

        let peer_notified = session
            .seat(binding.role.opposite())
            .is_some_and(|peer| peer.outbound.deliver(ServerMessage::peer_left(binding.role)).is_ok());

        let session_deleted = session.is_empty();
        if session_deleted {
            self.sessions.remove(&binding.session);
            tracing::info!(session = %binding.session, "Cleaned up empty session");
        }

        tracing::info!(
            conn = %conn_id,
            session = %binding.session,
            role = ?binding.role,
            peer_notified,
            ?connected_for,
            "Client disconnected"
        );

        Detached::Left {
            session: binding.session,
            role: binding.role,
            peer_notified,
            session_deleted,
        }
    }
}
