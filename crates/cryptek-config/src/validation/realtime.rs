//! Validation for the `[realtime]` section.

use crate::schema::CryptekConfig;

use super::helpers::validate_range;

/// Validate endpoint format and reconnect/timeout ranges.
pub(crate) fn validate_realtime(errors: &mut Vec<String>, config: &CryptekConfig) {
    let rt = &config.realtime;

    let url = rt.url.trim();
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(format!(
            "realtime.url = {:?} must start with ws:// or wss://",
            rt.url
        ));
    } else if url.trim_start_matches("wss://").trim_start_matches("ws://").is_empty() {
        errors.push("realtime.url has no host".to_string());
    }

    validate_range(
        errors,
        "realtime.max_reconnect_attempts",
        u64::from(rt.max_reconnect_attempts),
        0,
        50,
    );
    validate_range(
        errors,
        "realtime.reconnect_delay_ms",
        rt.reconnect_delay_ms,
        10,
        60_000,
    );
    validate_range(
        errors,
        "realtime.connect_timeout_secs",
        rt.connect_timeout_secs,
        1,
        120,
    );
}
