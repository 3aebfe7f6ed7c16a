// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types shared across the Leadhub workspace.
//!
//! All persisted entities are partitioned by tenant: no entity is ever
//! visible or mutable across tenants. Timestamps are RFC 3339 UTC strings,
//! matching the storage layer's `strftime('%Y-%m-%dT%H:%M:%fZ')` format.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The external surface an event or correlation key originates from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// The community chat platform (guild/DM based).
    Chat,
    /// The commerce/membership platform.
    Commerce,
}

/// Message direction relative to the tenant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Lead lifecycle status.
///
/// Statuses are ordered by `rank()`: member sync only ever moves a lead
/// *forward* to `Won`, never backward over a more advanced manual status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Lost,
    Won,
}

impl LeadStatus {
    /// Position in the lifecycle; higher is more advanced.
    pub fn rank(self) -> u8 {
        match self {
            LeadStatus::New => 0,
            LeadStatus::Contacted => 1,
            LeadStatus::Qualified => 2,
            LeadStatus::Lost => 3,
            LeadStatus::Won => 4,
        }
    }
}

/// An internal account, unique per (external platform user id, tenant).
///
/// The same external user id may own one `AppUser` in each of several
/// tenants; never two in the same tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUser {
    pub id: String,
    pub external_user_id: String,
    pub tenant_id: String,
    pub display_name: String,
    pub created_at: String,
}

/// A chat-platform integration owned by one [`AppUser`].
///
/// Volatile fields (`guild_id`, `guild_name`, `bot_user_id`) are cleared when
/// the binding goes stale under conservative repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelBinding {
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub bot_user_id: Option<String>,
    pub is_active: bool,
    pub last_synced_at: Option<String>,
    pub member_count: i64,
    pub channel_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// The unit the identity resolver resolves to.
///
/// External correlation keys are all optional: a manually created lead
/// legitimately has none. Uniqueness is partial, scoped to
/// `(tenant_id, chat_user_id)` and `(tenant_id, membership_id)` and enforced
/// only where the key is non-null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub tenant_id: String,
    pub owner_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub status: LeadStatus,
    pub chat_user_id: Option<String>,
    pub membership_id: Option<String>,
    pub customer_id: Option<String>,
    pub won_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A message belonging to exactly one [`Lead`].
///
/// Invariant: `owner_id` always equals the parent lead's current `owner_id`.
/// Ownership drift (lead reassigned after the message was written) is the
/// primary reconciliation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub lead_id: String,
    pub tenant_id: String,
    pub owner_id: String,
    pub direction: Direction,
    pub channel: Channel,
    pub content: String,
    /// Originating external message id, unique per channel when present.
    /// Used for idempotent replay de-duplication.
    pub external_id: Option<String>,
    pub created_at: String,
}

// --- Capability payload types ---

/// A member of a chat-platform guild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildMember {
    pub user_id: String,
    pub username: String,
}

/// A membership record from the commerce platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub membership_id: String,
    /// May be absent for incomplete checkouts; such records are skipped.
    pub user_id: Option<String>,
}

/// A user profile from the commerce platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommerceUser {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Current UTC timestamp in the canonical storage format.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
