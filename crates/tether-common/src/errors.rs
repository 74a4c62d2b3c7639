use std::path::PathBuf;

use crate::types::Role;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Errors produced by pairing and dispatch.
///
/// The `Display` text is what the originating connection sees in its
/// `error` notification, so keep it human-readable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Session already has a {0}")]
    RoleConflict(Role),

    #[error("Connection already attached to a session")]
    AlreadyAttached,

    #[error("Invalid message format")]
    MalformedMessage(String),

    /// Never surfaced to the sender; relays to an absent peer are dropped.
    #[error("Peer unavailable")]
    PeerUnavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("port = 0".into());
        assert_eq!(err.to_string(), "config validation error: port = 0");
    }

    #[test]
    fn relay_error_display_is_user_facing() {
        assert_eq!(RelayError::SessionNotFound.to_string(), "Session not found");
        assert_eq!(
            RelayError::RoleConflict(Role::Host).to_string(),
            "Session already has a host"
        );
        assert_eq!(
            RelayError::RoleConflict(Role::Client).to_string(),
            "Session already has a client"
        );
        assert_eq!(
            RelayError::MalformedMessage("expected value".into()).to_string(),
            "Invalid message format"
        );
        assert_eq!(
            RelayError::AlreadyAttached.to_string(),
            "Connection already attached to a session"
        );
    }

    #[test]
    fn tether_error_from_config() {
        let err: TetherError = ConfigError::ParseError("bad toml".into()).into();
        assert!(matches!(err, TetherError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn tether_error_from_relay() {
        let err: TetherError = RelayError::SessionNotFound.into();
        assert!(matches!(err, TetherError::Relay(_)));
        assert_eq!(err.to_string(), "Session not found");
    }

    #[test]
    fn tether_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: TetherError = io_err.into();
        assert!(matches!(err, TetherError::Io(_)));
        assert!(err.to_string().contains("port taken"));
    }
}
