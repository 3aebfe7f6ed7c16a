// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Leadhub CRM engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Leadhub configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeadhubConfig {
    /// Engine-wide settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Webhook/WebSocket gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chat platform capability settings.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Commerce platform capability settings.
    #[serde(default)]
    pub commerce: CommerceConfig,

    /// Member sync settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Gateway (webhook ingress + realtime relay) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "leadhub.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Chat platform capability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Bot token for the chat platform. `None` disables the capability.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Base URL of the chat platform REST API.
    #[serde(default = "default_chat_api_base")]
    pub api_base: String,

    /// Bounded timeout for every chat API call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: default_chat_api_base(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_chat_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

/// Commerce platform capability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommerceConfig {
    /// API key for the commerce platform. `None` disables the capability.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the commerce platform REST API.
    #[serde(default = "default_commerce_api_base")]
    pub api_base: String,

    /// Bounded timeout for every commerce API call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_commerce_api_base(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_commerce_api_base() -> String {
    "https://api.whop.com/v2".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

/// Member sync configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Re-validate the channel binding before every guild member import.
    #[serde(default = "default_validate_binding")]
    pub validate_binding: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            validate_binding: default_validate_binding(),
        }
    }
}

fn default_validate_binding() -> bool {
    true
}
