//! Pairing state machine: a connection claims the host or client seat.
//!
//! `EMPTY → ONE_ROLE → PAIRED`, and back down on disconnect. Claims are
//! first-come-first-served; an occupied seat is never taken over.

use tether_common::{ConnectionId, RelayError, Role, SessionId};

use crate::protocol::ServerMessage;
use crate::registry::Binding;
use crate::session::{PairingState, Seat};
use crate::store::Registries;

impl Registries {
    /// Seat `conn` as `role` in `session_id`.
    ///
    /// On success the joiner gets a ready confirmation and, if the opposite
    /// seat is already filled, that peer is told the session is now paired.
    /// On failure nothing changes.
    pub fn attach(
        &mut self,
        conn_id: &ConnectionId,
        session_id: &SessionId,
        role: Role,
    ) -> Result<PairingState, RelayError> {
        let Some(conn) = self.connections.get(conn_id) else {
            // Transport already gone; nothing to bind.
            return Err(RelayError::PeerUnavailable);
        };
        if conn.binding.is_some() {
            return Err(RelayError::AlreadyAttached);
        }
        let outbound = conn.outbound.clone();

        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(RelayError::SessionNotFound)?;

        let seat = session.seat_mut(role);
        if seat.is_some() {
            return Err(RelayError::RoleConflict(role));
        }
        *seat = Some(Seat {
            conn: conn_id.clone(),
            outbound: outbound.clone(),
        });

        let state = session.state();
        let peer = session.seat(role.opposite()).map(|s| s.outbound.clone());

        if let Some(conn) = self.connections.get_mut(conn_id) {
            conn.binding = Some(Binding {
                session: session_id.clone(),
                role,
            });
        }

        let _ = outbound.deliver(ServerMessage::ready(role, session_id.clone()));
        if let Some(peer) = peer {
            let _ = peer.deliver(ServerMessage::peer_joined(role));
        }

        tracing::info!(
            conn = %conn_id,
            session = %session_id,
            role = ?role,
            state = ?state,
            "Role attached"
        );

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Instant;

    use tokio::sync::mpsc;

    use super::*;
    use crate::registry::Outbound;

    fn addr() -> SocketAddr {
        "127.0.0.1:6000".parse().unwrap()
    }

    fn connect(reg: &mut Registries) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let id = ConnectionId::new();
        reg.register(id.clone(), addr(), Outbound::new(tx));
        (id, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn host_then_client_pairs_session() {
        let mut reg = Registries::new(6);
        let sid = reg.create_session(Instant::now());
        let (host, mut host_rx) = connect(&mut reg);
        let (client, mut client_rx) = connect(&mut reg);

        assert_eq!(reg.attach(&host, &sid, Role::Host), Ok(PairingState::OneRole));
        assert_eq!(
            drain(&mut host_rx),
            vec![ServerMessage::ready(Role::Host, sid.clone())]
        );

        assert_eq!(reg.attach(&client, &sid, Role::Client), Ok(PairingState::Paired));
        assert_eq!(
            drain(&mut client_rx),
            vec![ServerMessage::ready(Role::Client, sid.clone())]
        );
        assert_eq!(
            drain(&mut host_rx),
            vec![ServerMessage::peer_joined(Role::Client)]
        );

        assert!(reg.sessions.get(&sid).unwrap().is_active());
        reg.check_invariants().unwrap();
    }

    #[test]
    fn client_then_host_is_symmetric() {
        let mut reg = Registries::new(6);
        let sid = reg.create_session(Instant::now());
        let (host, mut host_rx) = connect(&mut reg);
        let (client, mut client_rx) = connect(&mut reg);

        assert_eq!(reg.attach(&client, &sid, Role::Client), Ok(PairingState::OneRole));
        assert_eq!(reg.attach(&host, &sid, Role::Host), Ok(PairingState::Paired));

        assert_eq!(
            drain(&mut client_rx),
            vec![
                ServerMessage::ready(Role::Client, sid.clone()),
                ServerMessage::peer_joined(Role::Host),
            ]
        );
        assert_eq!(
            drain(&mut host_rx),
            vec![ServerMessage::ready(Role::Host, sid.clone())]
        );
        reg.check_invariants().unwrap();
    }

    #[test]
    fn unknown_session_fails_without_binding() {
        let mut reg = Registries::new(6);
        let (conn, mut rx) = connect(&mut reg);

        let result = reg.attach(&conn, &SessionId::parse("ZZZZZZ"), Role::Host);
        assert_eq!(result, Err(RelayError::SessionNotFound));
        assert!(reg.connections.get(&conn).unwrap().binding.is_none());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn second_host_is_rejected_and_first_kept() {
        let mut reg = Registries::new(6);
        let sid = reg.create_session(Instant::now());
        let (first, _rx1) = connect(&mut reg);
        let (second, mut rx2) = connect(&mut reg);

        reg.attach(&first, &sid, Role::Host).unwrap();
        let result = reg.attach(&second, &sid, Role::Host);

        assert_eq!(result, Err(RelayError::RoleConflict(Role::Host)));
        let snap = reg.sessions.get(&sid).unwrap().snapshot();
        assert_eq!(snap.host, Some(first));
        assert!(reg.connections.get(&second).unwrap().binding.is_none());
        assert!(drain(&mut rx2).is_empty());
        reg.check_invariants().unwrap();
    }

    #[test]
    fn second_client_is_rejected() {
        let mut reg = Registries::new(6);
        let sid = reg.create_session(Instant::now());
        let (first, _rx1) = connect(&mut reg);
        let (second, _rx2) = connect(&mut reg);

        reg.attach(&first, &sid, Role::Client).unwrap();
        assert_eq!(
            reg.attach(&second, &sid, Role::Client),
            Err(RelayError::RoleConflict(Role::Client))
        );
    }

    #[test]
    fn bound_connection_cannot_attach_again() {
        let mut reg = Registries::new(6);
        let sid = reg.create_session(Instant::now());
        let other = reg.create_session(Instant::now());
        let (conn, _rx) = connect(&mut reg);

        reg.attach(&conn, &sid, Role::Host).unwrap();
        assert_eq!(
            reg.attach(&conn, &sid, Role::Client),
            Err(RelayError::AlreadyAttached)
        );
        assert_eq!(
            reg.attach(&conn, &other, Role::Host),
            Err(RelayError::AlreadyAttached)
        );
        assert_eq!(reg.sessions.get(&other).unwrap().state(), PairingState::Empty);
        reg.check_invariants().unwrap();
    }

    #[test]
    fn unregistered_connection_cannot_attach() {
        let mut reg = Registries::new(6);
        let sid = reg.create_session(Instant::now());
        let ghost = ConnectionId::new();
        assert_eq!(
            reg.attach(&ghost, &sid, Role::Host),
            Err(RelayError::PeerUnavailable)
        );
        assert_eq!(reg.sessions.get(&sid).unwrap().state(), PairingState::Empty);
    }
}
