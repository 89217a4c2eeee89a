//! Cryptek configuration system.
//!
//! TOML-based configuration for the realtime client. Every section uses
//! serde defaults so a partial (or missing) file works out of the box, and
//! the transport endpoint can be overridden from the environment.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cryptek_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod env;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use env::{apply_env_overrides, WS_URL_ENV};
pub use schema::{CryptekConfig, LogLevel, LoggingConfig, RealtimeSection, CONFIG_SCHEMA_VERSION};

use cryptek_common::ConfigError;

/// Load config from the platform default path, apply environment
/// overrides, and validate the result.
///
/// Unlike [`toml_loader::load_from_path`], validation failures here are
/// returned as errors: this is the entry point binaries use at startup.
pub fn load_config() -> Result<CryptekConfig, ConfigError> {
    let mut config = toml_loader::load_default()?;
    apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &CryptekConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
