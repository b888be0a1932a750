//! Reading a config file into [`TandemConfig`].

use crate::schema::TandemConfig;
use crate::validation;
use std::io::ErrorKind;
use std::path::Path;
use tandem_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Parse the config at `path`.
///
/// Sections and fields missing from the file take their defaults.
/// Out-of-range values are reported but kept, so `validation::validate`
/// decides whether a caller accepts them.
pub fn load_from_path(path: &Path) -> Result<TandemConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "cannot read {}: {e}",
                path.display()
            )))
        }
    };

    let config: TandemConfig = toml::from_str(&content).map_err(|e| {
        ConfigError::ParseError(format!("{}: {}", path.display(), e.message()))
    })?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "config has out-of-range values");
    }

    info!(
        path = %path.display(),
        mode = ?config.room.mode,
        "loaded config"
    );
    Ok(config)
}

/// Load the config from [`default_config_path`].
///
/// A missing file is created from the commented template. A file that
/// does not parse is left untouched and defaults are used instead.
pub fn load_default() -> Result<TandemConfig, ConfigError> {
    load_or_create(&default_config_path()?)
}

pub(crate) fn load_or_create(path: &Path) -> Result<TandemConfig, ConfigError> {
    match load_from_path(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(path)?;
            Ok(TandemConfig::default())
        }
        Err(ConfigError::ParseError(reason)) => {
            warn!(reason = %reason, "unreadable config, using defaults");
            Ok(TandemConfig::default())
        }
        Err(e) => Err(e),
    }
}
