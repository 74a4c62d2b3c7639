//! Range validation for relay configuration.
//!
//! Every check appends to a shared error list so a bad config reports all of
//! its problems at once.

use crate::schema::RelayConfig;
use tether_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }

    validate_range(
        &mut errors,
        "sessions.code_length",
        config.sessions.code_length as u64,
        4,
        16,
    );
    validate_range(
        &mut errors,
        "sessions.idle_ttl_secs",
        config.sessions.idle_ttl_secs,
        1,
        7 * 24 * 60 * 60,
    );
    validate_range(
        &mut errors,
        "sessions.reap_interval_secs",
        config.sessions.reap_interval_secs,
        1,
        24 * 60 * 60,
    );
    validate_range(
        &mut errors,
        "connections.send_queue",
        config.connections.send_queue as u64,
        1,
        65_536,
    );
    validate_range(
        &mut errors,
        "connections.heartbeat_interval_secs",
        config.connections.heartbeat_interval_secs,
        1,
        3600,
    );

    if config.connections.idle_timeout_secs <= config.connections.heartbeat_interval_secs {
        errors.push(format!(
            "connections.idle_timeout_secs = {} must exceed heartbeat_interval_secs = {}",
            config.connections.idle_timeout_secs, config.connections.heartbeat_interval_secs
        ));
    }

    if config.logging.filter.trim().is_empty() {
        errors.push("logging.filter must not be empty".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

/// Push an error if `value` is outside `[min, max]`.
fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn zero_reap_interval_rejected() {
        let mut config = RelayConfig::default();
        config.sessions.reap_interval_secs = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("sessions.reap_interval_secs"));
    }

    #[test]
    fn short_code_rejected() {
        let mut config = RelayConfig::default();
        config.sessions.code_length = 2;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("sessions.code_length = 2"));
    }

    #[test]
    fn idle_timeout_must_exceed_heartbeat() {
        let mut config = RelayConfig::default();
        config.connections.heartbeat_interval_secs = 60;
        config.connections.idle_timeout_secs = 60;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("idle_timeout_secs"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = RelayConfig::default();
        config.server.host = String::new();
        config.connections.send_queue = 0;
        config.logging.filter = " ".into();
        let msg = validate(&config).unwrap_err().to_string();
        assert!(msg.contains("server.host"));
        assert!(msg.contains("connections.send_queue"));
        assert!(msg.contains("logging.filter"));
        assert_eq!(msg.matches("; ").count(), 2);
    }
}
