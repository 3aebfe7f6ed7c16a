// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat capability with scripted guilds and members.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use leadhub_core::types::GuildMember;
use leadhub_core::{Capability, ChatCapability, LeadhubError};

/// Scripted in-memory chat platform.
///
/// Guild membership and accessibility are plain data; tests mutate them to
/// simulate revoked access. Outbound sends are captured for assertion and
/// can be forced to fail.
#[derive(Default)]
pub struct MockChat {
    guilds: Mutex<HashSet<String>>,
    members: Mutex<HashMap<String, Vec<GuildMember>>>,
    sent: Mutex<Vec<(String, String)>>,
    active: AtomicBool,
    fail_sends: AtomicBool,
    send_counter: AtomicU64,
}

impl MockChat {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.active.store(true, Ordering::SeqCst);
        mock
    }

    /// Replace the set of guilds the bot can currently access.
    pub fn set_guilds<I: IntoIterator<Item = S>, S: Into<String>>(&self, guilds: I) {
        *self.guilds.lock().unwrap() = guilds.into_iter().map(Into::into).collect();
    }

    /// Script the member list for a guild.
    pub fn set_members(&self, guild_id: &str, members: Vec<GuildMember>) {
        self.members
            .lock()
            .unwrap()
            .insert(guild_id.to_string(), members);
    }

    /// Make every subsequent `send_message` fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Every `(channel_id, content)` pair sent so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Capability for MockChat {
    fn name(&self) -> &str {
        "mock-chat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn start(&self) -> Result<(), LeadhubError> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), LeadhubError> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatCapability for MockChat {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String, LeadhubError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(LeadhubError::platform("mock chat send failure"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), content.to_string()));
        let n = self.send_counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("chat-msg-{n}"))
    }

    async fn list_accessible_guilds(&self) -> Result<HashSet<String>, LeadhubError> {
        Ok(self.guilds.lock().unwrap().clone())
    }

    // Scripted member lists are independent of the accessibility set: the
    // real platform serves the two from separate endpoints, and tests need
    // to script them apart (e.g. guild listing broken, member fetch fine).
    async fn list_guild_members(&self, guild_id: &str) -> Result<Vec<GuildMember>, LeadhubError> {
        self.members
            .lock()
            .unwrap()
            .get(guild_id)
            .cloned()
            .ok_or_else(|| {
                LeadhubError::platform(format!("mock chat: unknown guild '{guild_id}'"))
            })
    }
}
