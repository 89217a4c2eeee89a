//! Environment overrides applied on top of the file config.

use tracing::info;

use crate::schema::CryptekConfig;

/// Environment variable that overrides `realtime.url`.
pub const WS_URL_ENV: &str = "CRYPTEK_WS_URL";

/// Apply environment overrides read from the process environment.
pub fn apply_env_overrides(config: &mut CryptekConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides using an arbitrary lookup. Empty values are ignored.
pub fn apply_overrides_from<F>(config: &mut CryptekConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(WS_URL_ENV) {
        let url = url.trim();
        if !url.is_empty() {
            info!(env = WS_URL_ENV, url = %url, "realtime url overridden from environment");
            config.realtime.url = url.to_string();
        }
    }
}
