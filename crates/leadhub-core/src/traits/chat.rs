// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-platform capability trait (guild/DM based messaging).

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::LeadhubError;
use crate::traits::capability::Capability;
use crate::types::GuildMember;

/// Opaque provider of chat-platform operations.
///
/// The engine only needs three things from the chat platform: send a message,
/// enumerate the guilds the bot identity can currently see (binding
/// validation), and list a guild's members (member import).
#[async_trait]
pub trait ChatCapability: Capability {
    /// Send a message to a channel or DM. Returns the external message id.
    async fn send_message(&self, channel_id: &str, content: &str)
        -> Result<String, LeadhubError>;

    /// The set of guild ids the bot identity can currently access.
    async fn list_accessible_guilds(&self) -> Result<HashSet<String>, LeadhubError>;

    /// All members of the given guild.
    async fn list_guild_members(&self, guild_id: &str)
        -> Result<Vec<GuildMember>, LeadhubError>;
}
