use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-connection queueing and liveness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Outbound queue depth. Messages beyond this are dropped.
    pub send_queue: usize,
    /// Interval between server-initiated WebSocket pings.
    pub heartbeat_interval_secs: u64,
    /// A connection silent for this long is treated as closed.
    pub idle_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            send_queue: 256,
            heartbeat_interval_secs: 30,
            idle_timeout_secs: 90,
        }
    }
}

impl ConnectionConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
