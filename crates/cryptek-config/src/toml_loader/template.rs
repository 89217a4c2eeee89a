//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Cryptek Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[realtime]
# Chat server endpoint. CRYPTEK_WS_URL overrides this when set.
# url = "ws://localhost:8080"
# max_reconnect_attempts = 5     # 0-50
# reconnect_delay_ms = 1000      # 10-60000, attempt n waits n x delay
# connect_timeout_secs = 15      # 1-120

[logging]
# level = "INFO"                 # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
