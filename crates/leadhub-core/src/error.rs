// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Leadhub CRM engine.

use thiserror::Error;

/// The primary error type used across all Leadhub crates.
#[derive(Debug, Error)]
pub enum LeadhubError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Identity-resolution failure: the inbound event carries no usable
    /// tenant or external-user context. Rejected events are acknowledged to
    /// the sender and never persisted.
    #[error("identity resolution failed: {0}")]
    Resolution(String),

    /// External platform errors (chat or commerce API failure, bad response).
    #[error("platform error: {message}")]
    Platform {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A channel binding references a guild the bot capability can no longer
    /// access. Surfaced as its own variant so sync callers can short-circuit
    /// instead of running a doomed import.
    #[error("stale channel binding: {reason}")]
    StaleBinding { reason: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LeadhubError {
    /// Shorthand for a platform error without an underlying source.
    pub fn platform(message: impl Into<String>) -> Self {
        LeadhubError::Platform {
            message: message.into(),
            source: None,
        }
    }
}
