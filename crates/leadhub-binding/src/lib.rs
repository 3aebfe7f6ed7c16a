// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel binding validation.
//!
//! A tenant's chat integration is bound to one guild. External access can be
//! revoked at any time without notice, silently leaving the binding stale:
//! the bot identity no longer sees the bound guild. The validator detects
//! this against the capability's live guild set and repairs the binding.
//!
//! Conservative repair (the default, and the only automatic mode) marks the
//! binding inactive and clears volatile fields, forcing an explicit re-bind.
//! Aggressive repair rebinds to the first accessible guild; it is operator
//! invoked only, since silently rebinding to an arbitrary guild can
//! misattribute every future lead.

use std::sync::Arc;

use leadhub_core::types::ChannelBinding;
use leadhub_core::{ChatCapability, LeadhubError};
use leadhub_storage::queries::bindings;
use leadhub_storage::Database;
use strum::Display;
use tracing::{info, warn};

/// Why a binding is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StaleReason {
    /// The binding has no bound guild id at all.
    #[strum(serialize = "guild unset")]
    GuildUnset,
    /// The bot capability can no longer access the bound guild.
    #[strum(serialize = "guild inaccessible")]
    GuildInaccessible,
}

/// Result of validating one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStatus {
    Valid,
    Stale(StaleReason),
}

/// How to repair a stale binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepairMode {
    /// Deactivate and clear volatile fields; the user must re-bind.
    #[default]
    Conservative,
    /// Rebind to the first currently-accessible guild and reset sync
    /// counters to force a fresh member import.
    Aggressive,
}

/// Validates bindings against the chat capability's live guild set.
pub struct BindingValidator {
    db: Database,
    chat: Arc<dyn ChatCapability>,
}

impl BindingValidator {
    pub fn new(db: Database, chat: Arc<dyn ChatCapability>) -> Self {
        Self { db, chat }
    }

    /// Check whether a binding's guild is still accessible.
    pub async fn validate(&self, binding: &ChannelBinding) -> Result<BindingStatus, LeadhubError> {
        let Some(guild_id) = binding.guild_id.as_deref() else {
            return Ok(BindingStatus::Stale(StaleReason::GuildUnset));
        };

        let accessible = self.chat.list_accessible_guilds().await?;
        if accessible.contains(guild_id) {
            Ok(BindingStatus::Valid)
        } else {
            Ok(BindingStatus::Stale(StaleReason::GuildInaccessible))
        }
    }

    /// Validate, and convert staleness into a typed error.
    ///
    /// Sync callers use this to short-circuit instead of silently syncing
    /// zero members from an inaccessible guild.
    pub async fn ensure_valid(&self, binding: &ChannelBinding) -> Result<(), LeadhubError> {
        match self.validate(binding).await? {
            BindingStatus::Valid => Ok(()),
            BindingStatus::Stale(reason) => Err(LeadhubError::StaleBinding {
                reason: reason.to_string(),
            }),
        }
    }

    /// Repair a stale binding and persist the result. Returns the updated
    /// binding. Validating first is the caller's job; repairing a valid
    /// binding is harmless but resets its volatile state.
    pub async fn repair(
        &self,
        binding: &ChannelBinding,
        mode: RepairMode,
    ) -> Result<ChannelBinding, LeadhubError> {
        let mut repaired = binding.clone();
        match mode {
            RepairMode::Conservative => {
                repaired.is_active = false;
                repaired.guild_id = None;
                repaired.guild_name = None;
                repaired.bot_user_id = None;
                repaired.last_synced_at = None;
                repaired.member_count = 0;
                repaired.channel_count = 0;
                info!(binding_id = %binding.id, "binding deactivated, awaiting re-bind");
            }
            RepairMode::Aggressive => {
                let mut guilds: Vec<String> =
                    self.chat.list_accessible_guilds().await?.into_iter().collect();
                guilds.sort();
                let Some(first) = guilds.into_iter().next() else {
                    // Nothing to rebind to; fall back to deactivation.
                    warn!(binding_id = %binding.id, "no accessible guilds, deactivating instead");
                    return Box::pin(self.repair(binding, RepairMode::Conservative)).await;
                };
                repaired.guild_id = Some(first.clone());
                repaired.guild_name = None;
                repaired.is_active = true;
                repaired.last_synced_at = None;
                repaired.member_count = 0;
                repaired.channel_count = 0;
                info!(binding_id = %binding.id, guild_id = %first, "binding rebound to accessible guild");
            }
        }
        bindings::update_binding(&self.db, &repaired).await?;
        Ok(repaired)
    }

    /// Validate every active binding; conservatively repair the stale ones.
    ///
    /// Returns `(binding id, reason)` for each binding found stale.
    pub async fn sweep(&self) -> Result<Vec<(String, StaleReason)>, LeadhubError> {
        let mut stale = Vec::new();
        for binding in bindings::list_active_bindings(&self.db).await? {
            if let BindingStatus::Stale(reason) = self.validate(&binding).await? {
                warn!(binding_id = %binding.id, %reason, "stale binding detected");
                self.repair(&binding, RepairMode::Conservative).await?;
                stale.push((binding.id, reason));
            }
        }
        Ok(stale)
    }
}
