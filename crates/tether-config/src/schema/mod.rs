//! Configuration schema for the relay.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod connections;
mod logging;
mod server;
mod sessions;

pub use connections::*;
pub use logging::*;
pub use server::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};

/// Root configuration for `tether-relay`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub sessions: SessionConfig,
    pub connections: ConnectionConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RelayConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.sessions.code_length, 6);
        assert_eq!(config.sessions.idle_ttl().as_secs(), 1800);
        assert_eq!(config.sessions.reap_interval().as_secs(), 300);
        assert_eq!(config.connections.send_queue, 256);
        assert_eq!(config.connections.heartbeat_interval().as_secs(), 30);
        assert_eq!(config.connections.idle_timeout().as_secs(), 90);
        assert_eq!(config.logging.filter, "tether_relay=info");
    }

    #[test]
    fn empty_toml_is_default() {
        let config: RelayConfig = toml::from_str("").unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: RelayConfig = toml::from_str("[sessions]\nidle_ttl_secs = 60\n").unwrap();
        assert_eq!(config.sessions.idle_ttl_secs, 60);
        assert_eq!(config.sessions.reap_interval_secs, 300);
        assert_eq!(config.server, ServerConfig::default());
    }
}
