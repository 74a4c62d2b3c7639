//! Shared relay state: both registries behind one lock.
//!
//! Every mutation that touches a session and a connection goes through a
//! method on [`Registries`] so the two sides never drift apart. Pairing lives
//! in `pairing.rs`, teardown in `disconnect.rs`, forwarding in `dispatch.rs`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tether_common::{ConnectionId, RelayError, Role, SessionId};
use tokio::sync::{mpsc, RwLock};

use crate::disconnect::Detached;
use crate::protocol::{PayloadKind, ServerMessage};
use crate::registry::{ConnectionRegistry, Outbound};
use crate::session::{PairingState, SessionRegistry, SessionSnapshot};

pub struct Registries {
    pub(crate) sessions: SessionRegistry,
    pub(crate) connections: ConnectionRegistry,
}

impl Registries {
    pub fn new(code_length: usize) -> Self {
        Self {
            sessions: SessionRegistry::new(code_length),
            connections: ConnectionRegistry::new(),
        }
    }

    pub fn create_session(&mut self, now: Instant) -> SessionId {
        let id = self.sessions.create(&mut rand::thread_rng(), now);
        tracing::info!(session = %id, "Session created");
        id
    }

    pub fn register(&mut self, id: ConnectionId, addr: SocketAddr, outbound: Outbound) {
        self.connections.insert(id, addr, outbound);
    }

    /// Send to one connection. Returns false if it is gone or its queue
    /// rejected the message.
    pub fn send_to(&self, conn: &ConnectionId, msg: ServerMessage) -> bool {
        self.connections
            .get(conn)
            .is_some_and(|c| c.outbound.deliver(msg).is_ok())
    }

    /// Remove a session and release whoever still holds a seat in it.
    ///
    /// Idempotent. Seated connections stay open but become unpaired and are
    /// told the session expired.
    pub fn delete_session(&mut self, id: &SessionId) -> bool {
        let Some(session) = self.sessions.remove(id) else {
            return false;
        };

        for role in [Role::Host, Role::Client] {
            if let Some(seat) = session.seat(role) {
                if let Some(conn) = self.connections.get_mut(&seat.conn) {
                    conn.binding = None;
                }
                let _ = seat.outbound.deliver(ServerMessage::session_expired());
            }
        }

        tracing::info!(session = %id, "Session deleted");
        true
    }

    /// Verify the session ↔ connection back-references agree.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        for session in self.sessions.iter() {
            for role in [Role::Host, Role::Client] {
                if let Some(seat) = session.seat(role) {
                    let conn = self
                        .connections
                        .get(&seat.conn)
                        .ok_or_else(|| format!("{} {role} seat points at missing conn", session.id))?;
                    let binding = conn
                        .binding
                        .as_ref()
                        .ok_or_else(|| format!("{} {role} seat holder is unbound", session.id))?;
                    if binding.session != session.id || binding.role != role {
                        return Err(format!("{} {role} seat holder bound elsewhere", session.id));
                    }
                }
            }
            if session.is_active() != (session.state() == PairingState::Paired) {
                return Err(format!("{} active flag disagrees with seats", session.id));
            }
        }

        for conn in self.connections.iter() {
            if let Some(binding) = &conn.binding {
                let session = self
                    .sessions
                    .get(&binding.session)
                    .ok_or_else(|| format!("{} bound to missing session", conn.id))?;
                let holder = session.seat(binding.role).map(|s| &s.conn);
                if holder != Some(&conn.id) {
                    return Err(format!("{} not seated where its binding says", conn.id));
                }
            }
        }
        Ok(())
    }
}

/// Counts reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub sessions: usize,
    pub connections: usize,
}

/// Thread-safe handle to the relay state. Cheap to clone.
#[derive(Clone)]
pub struct RelayStore {
    inner: Arc<RwLock<Registries>>,
    send_queue: usize,
}

impl RelayStore {
    pub fn new(code_length: usize, send_queue: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Registries::new(code_length))),
            send_queue,
        }
    }

    /// Create a new empty session and return its code.
    ///
    /// The creation time comes from the tokio clock, so a paused runtime
    /// controls session age.
    pub async fn create_session(&self) -> SessionId {
        let now = tokio::time::Instant::now().into_std();
        self.inner.write().await.create_session(now)
    }

    pub async fn lookup(&self, id: &SessionId) -> Option<SessionSnapshot> {
        self.inner.read().await.sessions.get(id).map(|s| s.snapshot())
    }

    pub async fn exists(&self, id: &SessionId) -> bool {
        self.inner.read().await.sessions.contains(id)
    }

    pub async fn delete_session(&self, id: &SessionId) -> bool {
        self.inner.write().await.delete_session(id)
    }

    /// Register a freshly accepted connection and hand back its id and the
    /// receiving end of its outbound queue.
    pub async fn register_connection(
        &self,
        addr: SocketAddr,
    ) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.send_queue);
        self.inner
            .write()
            .await
            .register(id.clone(), addr, Outbound::new(tx));
        (id, rx)
    }

    pub async fn attach(
        &self,
        conn: &ConnectionId,
        session: &SessionId,
        role: Role,
    ) -> Result<PairingState, RelayError> {
        self.inner.write().await.attach(conn, session, role)
    }

    pub async fn relay(
        &self,
        from: &ConnectionId,
        kind: PayloadKind,
        data: Option<serde_json::Value>,
    ) -> Result<(), RelayError> {
        self.inner.read().await.relay(from, kind, data)
    }

    pub async fn disconnect(&self, conn: &ConnectionId) -> Detached {
        self.inner.write().await.detach(conn)
    }

    pub async fn send_to(&self, conn: &ConnectionId, msg: ServerMessage) -> bool {
        self.inner.read().await.send_to(conn, msg)
    }

    /// Delete every inactive session strictly older than `idle_ttl`.
    ///
    /// Candidates are collected under a read lock, then each is removed under
    /// its own short write lock after re-checking, so message handling is
    /// never blocked for a full sweep.
    pub async fn reap(&self, now: Instant, idle_ttl: Duration) -> Vec<SessionId> {
        let candidates = self
            .inner
            .read()
            .await
            .sessions
            .idle_candidates(now, idle_ttl);

        let mut reaped = Vec::with_capacity(candidates.len());
        for id in candidates {
            let mut inner = self.inner.write().await;
            let still_idle = inner
                .sessions
                .get(&id)
                .is_some_and(|s| s.is_idle(now, idle_ttl));
            if still_idle && inner.delete_session(&id) {
                tracing::info!(session = %id, "Reaped idle session");
                reaped.push(id);
            }
        }
        reaped
    }

    /// Run the disconnect path for connections whose transport task vanished
    /// without cleaning up.
    pub async fn sweep_closed(&self) -> usize {
        let closed = self.inner.read().await.connections.closed_ids();
        let mut swept = 0;
        for id in closed {
            if !matches!(self.disconnect(&id).await, Detached::Unknown) {
                tracing::info!(conn = %id, "Swept closed connection");
                swept += 1;
            }
        }
        swept
    }

    pub async fn stats(&self) -> RelayStats {
        let inner = self.inner.read().await;
        RelayStats {
            sessions: inner.sessions.len(),
            connections: inner.connections.len(),
        }
    }

    #[cfg(test)]
    pub(crate) async fn check_invariants(&self) -> Result<(), String> {
        self.inner.read().await.check_invariants()
    }
}
