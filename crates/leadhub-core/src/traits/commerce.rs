// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commerce-platform capability trait (memberships and customers).

use async_trait::async_trait;

use crate::error::LeadhubError;
use crate::traits::capability::Capability;
use crate::types::{CommerceUser, MembershipRecord};

/// Opaque provider of commerce-platform operations.
#[async_trait]
pub trait CommerceCapability: Capability {
    /// All membership records belonging to a tenant.
    async fn list_memberships(&self, tenant_id: &str)
        -> Result<Vec<MembershipRecord>, LeadhubError>;

    /// Profile lookup for a commerce user.
    async fn get_user(&self, user_id: &str) -> Result<CommerceUser, LeadhubError>;

    /// Send a direct message to a commerce user. Returns the external message id.
    async fn send_message(&self, user_id: &str, content: &str)
        -> Result<String, LeadhubError>;
}
