//! Full configuration validation.
//!
//! Validates numeric ranges and non-empty store paths, collecting every
//! problem into a single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::TandemConfig;
use helpers::{validate_non_empty, validate_path_segment, validate_range};
use tandem_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &TandemConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_non_empty(&mut errors, "discovery.service_id", &config.discovery.service_id);
    validate_range(
        &mut errors,
        "discovery.timeout_secs",
        config.discovery.timeout_secs,
        1,
        120,
    );
    validate_range(
        &mut errors,
        "pairing.timeout_secs",
        config.pairing.timeout_secs,
        5,
        600,
    );
    validate_range(
        &mut errors,
        "store.ready_wait_cap_secs",
        config.store.ready_wait_cap_secs,
        1,
        120,
    );
    validate_range(
        &mut errors,
        "store.ready_poll_interval_ms",
        config.store.ready_poll_interval_ms,
        50,
        10_000,
    );
    validate_path_segment(&mut errors, "store.rooms_root", &config.store.rooms_root);
    validate_path_segment(&mut errors, "room.global_root", &config.room.global_root);
    validate_path_segment(
        &mut errors,
        "room.global_room_name",
        &config.room.global_room_name,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
