// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock commerce capability with scripted memberships and users.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use leadhub_core::types::{CommerceUser, MembershipRecord};
use leadhub_core::{Capability, CommerceCapability, LeadhubError};

/// Scripted in-memory commerce platform.
#[derive(Default)]
pub struct MockCommerce {
    memberships: Mutex<HashMap<String, Vec<MembershipRecord>>>,
    users: Mutex<HashMap<String, CommerceUser>>,
    sent: Mutex<Vec<(String, String)>>,
    active: AtomicBool,
    fail_user_lookups: AtomicBool,
    send_counter: AtomicU64,
}

impl MockCommerce {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.active.store(true, Ordering::SeqCst);
        mock
    }

    /// Script the membership list returned for a tenant.
    pub fn set_memberships(&self, tenant_id: &str, records: Vec<MembershipRecord>) {
        self.memberships
            .lock()
            .unwrap()
            .insert(tenant_id.to_string(), records);
    }

    /// Script a commerce user profile.
    pub fn set_user(&self, user_id: &str, user: CommerceUser) {
        self.users.lock().unwrap().insert(user_id.to_string(), user);
    }

    /// Make every subsequent `get_user` fail, simulating a flaky API.
    pub fn fail_user_lookups(&self, fail: bool) {
        self.fail_user_lookups.store(fail, Ordering::SeqCst);
    }

    /// Every `(user_id, content)` pair sent so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Capability for MockCommerce {
    fn name(&self) -> &str {
        "mock-commerce"
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
impl CommerceCapability for MockCommerce {
    async fn list_memberships(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<MembershipRecord>, LeadhubError> {
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .get(tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_user(&self, user_id: &str) -> Result<CommerceUser, LeadhubError> {
        if self.fail_user_lookups.load(Ordering::SeqCst) {
            return Err(LeadhubError::platform("mock commerce user lookup failure"));
        }
        self.users
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| LeadhubError::platform(format!("mock commerce: unknown user '{user_id}'")))
    }

    async fn send_message(&self, user_id: &str, content: &str) -> Result<String, LeadhubError> {
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), content.to_string()));
        let n = self.send_counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("commerce-msg-{n}"))
    }
}
