// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./leadhub.toml` > `~/.config/leadhub/leadhub.toml`
//! > `/etc/leadhub/leadhub.toml`, with environment variable overrides via the
//! `LEADHUB_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LeadhubConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/leadhub/leadhub.toml` (system-wide)
/// 3. `~/.config/leadhub/leadhub.toml` (user XDG config)
/// 4. `./leadhub.toml` (local directory)
/// 5. `LEADHUB_*` environment variables
pub fn load_config() -> Result<LeadhubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LeadhubConfig::default()))
        .merge(Toml::file("/etc/leadhub/leadhub.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("leadhub/leadhub.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("leadhub.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from an inline TOML string only (no XDG lookup).
pub fn load_config_from_str(toml_content: &str) -> Result<LeadhubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LeadhubConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LeadhubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LeadhubConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `LEADHUB_CHAT_BOT_TOKEN` must map to
/// `chat.bot_token`, not `chat.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("LEADHUB_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("chat_", "chat.", 1)
            .replacen("commerce_", "commerce.", 1)
            .replacen("sync_", "sync.", 1);
        mapped.into()
    })
}
