//! Relay configuration.
//!
//! TOML-based, every section defaulted so an empty file (or no file at all)
//! yields a working relay.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_config_path, load, load_from_path};
pub use schema::{ConnectionConfig, LoggingConfig, RelayConfig, ServerConfig, SessionConfig};
pub use validation::validate;

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &RelayConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
