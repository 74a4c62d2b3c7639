//! Session registry: maps session codes to their host/client seats.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use tether_common::{ConnectionId, Role, SessionId};

use crate::registry::Outbound;

/// Pairing status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    Empty,
    OneRole,
    Paired,
}

/// A connection occupying one role. The handle is stored here directly so
/// relaying never has to search the connection registry.
#[derive(Debug, Clone)]
pub struct Seat {
    pub conn: ConnectionId,
    pub outbound: Outbound,
}

#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub created_at: Instant,
    host: Option<Seat>,
    client: Option<Seat>,
}

impl Session {
    fn new(id: SessionId, created_at: Instant) -> Self {
        Self {
            id,
            created_at,
            host: None,
            client: None,
        }
    }

    pub fn seat(&self, role: Role) -> Option<&Seat> {
        match role {
            Role::Host => self.host.as_ref(),
            Role::Client => self.client.as_ref(),
        }
    }

    pub(crate) fn seat_mut(&mut self, role: Role) -> &mut Option<Seat> {
        match role {
            Role::Host => &mut self.host,
            Role::Client => &mut self.client,
        }
    }

    /// True iff both roles are filled. Derived, never stored.
    pub fn is_active(&self) -> bool {
        self.host.is_some() && self.client.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_none() && self.client.is_none()
    }

    pub fn state(&self) -> PairingState {
        match (self.host.is_some(), self.client.is_some()) {
            (true, true) => PairingState::Paired,
            (false, false) => PairingState::Empty,
            _ => PairingState::OneRole,
        }
    }

    /// Inactive and strictly older than `ttl` at `now`.
    pub fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        !self.is_active() && now.saturating_duration_since(self.created_at) > ttl
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            created_at: self.created_at,
            host: self.host.as_ref().map(|s| s.conn.clone()),
            client: self.client.as_ref().map(|s| s.conn.clone()),
            active: self.is_active(),
            state: self.state(),
        }
    }
}

/// Read-only copy of a session handed out by lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub created_at: Instant,
    pub host: Option<ConnectionId>,
    pub client: Option<ConnectionId>,
    pub active: bool,
    pub state: PairingState,
}

pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    code_length: usize,
}

impl SessionRegistry {
    pub fn new(code_length: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            code_length,
        }
    }

    /// Insert a fresh empty session under a code not currently in use.
    pub fn create<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Instant) -> SessionId {
        let id = loop {
            let candidate = SessionId::generate(rng, self.code_length);
            if !self.sessions.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!(session = %candidate, "Session code collision, retrying");
        };
        self.sessions
            .insert(id.clone(), Session::new(id.clone(), now));
        id
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub(crate) fn remove(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Codes of every session the reaper should remove at `now`.
    pub fn idle_candidates(&self, now: Instant, ttl: Duration) -> Vec<SessionId> {
        self.sessions
            .values()
            .filter(|s| s.is_idle(now, ttl))
            .map(|s| s.id.clone())
            .collect()
    }
}
