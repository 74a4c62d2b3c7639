//! tether-relay: rendezvous and relay server for host ↔ client sessions.
//!
//! A host and a client meet under a short session code, then the relay
//! forwards their messages over WebSocket. Payloads are never inspected.

pub mod connection;
pub mod disconnect;
pub mod dispatch;
pub mod pairing;
pub mod protocol;
pub mod reaper;
pub mod registry;
pub mod server;
pub mod session;
pub mod store;

pub use disconnect::Detached;
pub use protocol::{Inbound, PayloadKind, ServerMessage};
pub use server::{build_router, AppState, RelayServer, ServerHandle};
pub use session::{PairingState, SessionSnapshot};
pub use store::{RelayStats, RelayStore};
