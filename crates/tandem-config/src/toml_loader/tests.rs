//! Tests for TOML config loading, creation, and path resolution.

use super::loader::load_or_create;
use super::paths::config_path_from;
use super::template::default_config_toml;
use super::*;
use crate::schema::{RoomMode, TandemConfig};
use std::path::Path;
use tandem_common::ConfigError;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_tandem_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_partial_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[discovery]
timeout_secs = 20

[room]
mode = "global"
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.discovery.timeout_secs, 20);
    assert_eq!(config.room.mode, RoomMode::Global);
    assert_eq!(config.pairing.timeout_secs, 60);
    assert_eq!(config.store.ready_poll_interval_ms, 500);
}

#[test]
fn load_invalid_toml_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[discovery\ntimeout_secs = ").unwrap();
    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_out_of_range_values_still_returns_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[pairing]\ntimeout_secs = 1\n").unwrap();
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.pairing.timeout_secs, 1);
}

#[test]
fn create_default_config_writes_parseable_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    let defaults = TandemConfig::default();
    assert_eq!(config.discovery.timeout_secs, defaults.discovery.timeout_secs);
    assert_eq!(config.room.global_room_name, defaults.room.global_room_name);
}

#[test]
fn template_mentions_every_section() {
    let template = default_config_toml();
    for section in ["[discovery]", "[pairing]", "[store]", "[room]", "[logging]"] {
        assert!(template.contains(section), "missing {section}");
    }
}

#[test]
fn config_path_prefers_explicit_file() {
    let path = config_path_from(Some("/etc/tandem.toml".into()), Some("/home/u/.config".into()));
    assert_eq!(path.unwrap(), Path::new("/etc/tandem.toml"));
}

#[test]
fn config_path_ignores_empty_override() {
    let path = config_path_from(Some("".into()), Some("/home/u/.config".into())).unwrap();
    assert_eq!(path, Path::new("/home/u/.config/tandem/config.toml"));
}

#[test]
fn config_path_without_any_location_is_an_error() {
    let result = config_path_from(None, None);
    assert!(matches!(result, Err(ConfigError::ParseError(msg)) if msg.contains(CONFIG_PATH_ENV)));
}

#[test]
fn create_default_config_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[pairing]\ntimeout_secs = 30\n").unwrap();

    create_default_config(&path).unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "[pairing]\ntimeout_secs = 30\n"
    );
}

#[test]
fn load_or_create_writes_template_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tandem").join("config.toml");

    let config = load_or_create(&path).unwrap();

    assert!(path.exists());
    assert_eq!(config.pairing.timeout_secs, 60);
}

#[test]
fn load_or_create_falls_back_on_unparseable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[room\nmode = ").unwrap();

    let config = load_or_create(&path).unwrap();

    assert_eq!(config.room.mode, RoomMode::Paired);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[room\nmode = ");
}
