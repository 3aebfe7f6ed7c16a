// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for values Figment cannot check.

use leadhub_core::LeadhubError;

use crate::model::LeadhubConfig;

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate constraints that hold across the whole config.
pub fn validate_config(config: &LeadhubConfig) -> Result<(), LeadhubError> {
    if !VALID_LOG_LEVELS.contains(&config.engine.log_level.as_str()) {
        return Err(LeadhubError::Config(format!(
            "engine.log_level must be one of {VALID_LOG_LEVELS:?}, got '{}'",
            config.engine.log_level
        )));
    }

    if config.gateway.port == 0 {
        return Err(LeadhubError::Config(
            "gateway.port must be non-zero".to_string(),
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        return Err(LeadhubError::Config(
            "storage.database_path cannot be empty".to_string(),
        ));
    }

    if config.chat.request_timeout_secs == 0 || config.commerce.request_timeout_secs == 0 {
        return Err(LeadhubError::Config(
            "request_timeout_secs must be at least 1".to_string(),
        ));
    }

    Ok(())
}
