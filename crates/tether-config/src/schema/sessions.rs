use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session code generation and idle reaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Length of generated session codes.
    pub code_length: usize,
    /// Unpaired sessions older than this are reaped.
    pub idle_ttl_secs: u64,
    /// How often the reaper runs.
    pub reap_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            idle_ttl_secs: 30 * 60,
            reap_interval_secs: 5 * 60,
        }
    }
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}
