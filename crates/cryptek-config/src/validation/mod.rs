//! Full configuration validation.
//!
//! Each section has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod realtime;


use crate::schema::CryptekConfig;
use cryptek_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &CryptekConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    realtime::validate_realtime(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
