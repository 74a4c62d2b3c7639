//! TOML config loading: explicit path, platform default, or built-in defaults.

use crate::schema::RelayConfig;
use crate::validation;
use std::path::{Path, PathBuf};
use tether_common::ConfigError;
use tracing::{debug, info};

/// Platform-specific default config path.
///
/// On Linux: `~/.config/tether/relay.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?;
    Ok(config_dir.join("tether").join("relay.toml"))
}

/// Load and validate config from a specific TOML file.
///
/// Missing fields take their serde defaults. Unlike a desktop app, the relay
/// refuses to start on an invalid config.
pub fn load_from_path(path: &Path) -> Result<RelayConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: RelayConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    validation::validate(&config)?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Resolve the effective config.
///
/// An explicit path must exist. Without one, the platform default is used if
/// present, otherwise built-in defaults.
pub fn load(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    if let Some(path) = path {
        return load_from_path(path);
    }

    match default_config_path() {
        Ok(path) if path.exists() => load_from_path(&path),
        Ok(path) => {
            debug!("no config at {}, using defaults", path.display());
            Ok(RelayConfig::default())
        }
        Err(e) => {
            debug!("{e}, using defaults");
            Ok(RelayConfig::default())
        }
    }
}
