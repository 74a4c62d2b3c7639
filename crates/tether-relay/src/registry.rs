//! Connection registry: every live transport connection, paired or not.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use tether_common::{ConnectionId, RelayError, Role, SessionId};
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;

/// Sending half of a connection's outbound queue.
///
/// The transport task owns the receiver; dropping it closes the handle.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::Sender<ServerMessage>,
}

impl Outbound {
    pub fn new(tx: mpsc::Sender<ServerMessage>) -> Self {
        Self { tx }
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a message without waiting. A full or closed queue drops it.
    pub fn deliver(&self, msg: ServerMessage) -> Result<(), RelayError> {
        match self.tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Send queue full, dropping message");
                Err(RelayError::PeerUnavailable)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(RelayError::PeerUnavailable),
        }
    }
}

/// Which session and role a connection has claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub session: SessionId,
    pub role: Role,
}

#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    pub outbound: Outbound,
    pub binding: Option<Binding>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ConnectionId, addr: SocketAddr, outbound: Outbound) {
        self.connections.insert(
            id.clone(),
            Connection {
                id,
                addr,
                connected_at: Instant::now(),
                outbound,
                binding: None,
            },
        );
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    pub(crate) fn remove(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Connections whose transport task has gone away without cleanup.
    pub fn closed_ids(&self) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|c| !c.outbound.is_open())
            .map(|c| c.id.clone())
            .collect()
    }
}
