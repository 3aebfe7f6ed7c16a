// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stand-ins for platforms the operator has not configured.
//!
//! A missing token disables a capability rather than failing startup:
//! webhook ingress and reconciliation still work, and only operations that
//! actually need the platform fail with a clear error.

use std::collections::HashSet;

use async_trait::async_trait;
use leadhub_core::types::{CommerceUser, GuildMember, MembershipRecord};
use leadhub_core::{Capability, ChatCapability, CommerceCapability, LeadhubError};

fn disabled(which: &str) -> LeadhubError {
    LeadhubError::platform(format!("{which} capability is not configured"))
}

/// Chat capability with no credentials behind it.
pub struct DisabledChat;

#[async_trait]
impl Capability for DisabledChat {
    fn name(&self) -> &str {
        "chat-disabled"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn start(&self) -> Result<(), LeadhubError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), LeadhubError> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        false
    }
}

#[async_trait]
impl ChatCapability for DisabledChat {
    async fn send_message(&self, _channel_id: &str, _content: &str)
        -> Result<String, LeadhubError> {
        Err(disabled("chat"))
    }

    async fn list_accessible_guilds(&self) -> Result<HashSet<String>, LeadhubError> {
        Err(disabled("chat"))
    }

    async fn list_guild_members(&self, _guild_id: &str)
        -> Result<Vec<GuildMember>, LeadhubError> {
        Err(disabled("chat"))
    }
}

/// Commerce capability with no credentials behind it.
pub struct DisabledCommerce;

#[async_trait]
impl Capability for DisabledCommerce {
    fn name(&self) -> &str {
        "commerce-disabled"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn start(&self) -> Result<(), LeadhubError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), LeadhubError> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        false
    }
}

#[async_trait]
impl CommerceCapability for DisabledCommerce {
    async fn list_memberships(&self, _tenant_id: &str)
        -> Result<Vec<MembershipRecord>, LeadhubError> {
        Err(disabled("commerce"))
    }

    async fn get_user(&self, _user_id: &str) -> Result<CommerceUser, LeadhubError> {
        Err(disabled("commerce"))
    }

    async fn send_message(&self, _user_id: &str, _content: &str)
        -> Result<String, LeadhubError> {
        Err(disabled("commerce"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_chat_rejects_operations_but_starts() {
        let chat = DisabledChat;
        chat.start().await.unwrap();
        assert!(!chat.is_active());
        assert!(chat.send_message("c1", "hi").await.is_err());
        assert!(chat.list_accessible_guilds().await.is_err());
    }

    #[tokio::test]
    async fn disabled_commerce_rejects_operations() {
        let commerce = DisabledCommerce;
        assert!(!commerce.is_active());
        assert!(commerce.list_memberships("t1").await.is_err());
    }
}
