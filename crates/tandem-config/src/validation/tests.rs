//! Tests for the full validation pipeline.

use super::*;
use crate::schema::*;

#[test]
fn default_config_validates() {
    let config = TandemConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_discovery_timeout_zero() {
    let mut config = TandemConfig::default();
    config.discovery.timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("discovery.timeout_secs"));
}

#[test]
fn catches_pairing_timeout_too_large() {
    let mut config = TandemConfig::default();
    config.pairing.timeout_secs = 3600;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("pairing.timeout_secs"));
}

#[test]
fn catches_poll_interval_too_small() {
    let mut config = TandemConfig::default();
    config.store.ready_poll_interval_ms = 10;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("store.ready_poll_interval_ms"));
}

#[test]
fn catches_empty_service_id() {
    let mut config = TandemConfig::default();
    config.discovery.service_id = "  ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("discovery.service_id"));
}

#[test]
fn catches_slash_in_room_name() {
    let mut config = TandemConfig::default();
    config.room.global_room_name = "a/b".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("room.global_room_name"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = TandemConfig::default();
    config.discovery.timeout_secs = 0;
    config.store.rooms_root = String::new();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("discovery.timeout_secs"));
    assert!(err.contains("store.rooms_root"));
    assert!(err.contains("; "));
}

#[test]
fn boundary_values_are_accepted() {
    let mut config = TandemConfig::default();
    config.discovery.timeout_secs = 1;
    config.pairing.timeout_secs = 600;
    config.store.ready_wait_cap_secs = 120;
    config.store.ready_poll_interval_ms = 50;
    assert!(validate(&config).is_ok());
}
