// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Leadhub CRM engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides via the `LEADHUB_` prefix.
//!
//! # Usage
//!
//! ```no_run
//! let config = leadhub_config::load_and_validate().expect("config errors");
//! println!("gateway port: {}", config.gateway.port);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::LeadhubConfig;

use leadhub_core::LeadhubError;

/// Load configuration from the XDG hierarchy and validate it.
///
/// 1. Loads config from TOML files + env vars via Figment.
/// 2. Runs post-deserialization validation (ranges, enum strings).
pub fn load_and_validate() -> Result<LeadhubConfig, LeadhubError> {
    let config = loader::load_config().map_err(|e| LeadhubError::Config(e.to_string()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from an inline TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<LeadhubConfig, LeadhubError> {
    let config = loader::load_config_from_str(toml_content)
        .map_err(|e| LeadhubError::Config(e.to_string()))?;
    validation::validate_config(&config)?;
    Ok(config)
}
