//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Tandem Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[discovery]
# service_id = "dev.tandem.nearby"
# timeout_secs = 10        # 1-120

[pairing]
# timeout_secs = 60        # 5-600

[store]
# ready_wait_cap_secs = 10      # 1-120
# ready_poll_interval_ms = 500  # 50-10000
# rooms_root = "rooms"
# display_name = "Tandem"

[room]
# mode = "paired"          # paired, global
# with_pairing = false     # global mode only
# global_root = "global_rooms"
# global_room_name = "global_room_0"

[logging]
# level = "INFO"           # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
