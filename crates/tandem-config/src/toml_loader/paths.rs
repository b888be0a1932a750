//! Where the config file lives, and writing the commented default.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tandem_common::ConfigError;
use tracing::{debug, info};

use super::template::default_config_toml;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TANDEM_CONFIG";

/// The config file to use: `$TANDEM_CONFIG` if set and non-empty,
/// otherwise `tandem/config.toml` under the platform config directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    config_path_from(std::env::var_os(CONFIG_PATH_ENV), dirs::config_dir())
}

pub(crate) fn config_path_from(
    explicit: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    config_dir
        .map(|dir| dir.join("tandem").join("config.toml"))
        .ok_or_else(|| {
            ConfigError::ParseError(format!(
                "no platform config directory; set {CONFIG_PATH_ENV}"
            ))
        })
}

/// Write the commented default config to `path`.
///
/// An existing file is left alone.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_error = |e: std::io::Error| {
        ConfigError::ParseError(format!("cannot write {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "config already exists, not overwriting");
            return Ok(());
        }
        Err(e) => return Err(write_error(e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(write_error)?;

    info!(path = %path.display(), "wrote default config");
    Ok(())
}
