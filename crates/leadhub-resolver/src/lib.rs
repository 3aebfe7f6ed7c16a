// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External identity resolution.
//!
//! Maps an inbound external identity (chat user id or commerce membership id)
//! to exactly one lead scoped to exactly one tenant, creating the lead on
//! first contact. Lookup precedes creation and creation is keyed on the
//! schema's partial unique index, so the whole operation is idempotent and
//! safe under concurrent webhook delivery.

pub mod extract;

use leadhub_core::types::{now_rfc3339, Channel, Lead, LeadStatus};
use leadhub_core::LeadhubError;
use leadhub_storage::database::is_unique_violation;
use leadhub_storage::queries::{leads, users};
use leadhub_storage::Database;
use tracing::{debug, info};

/// Resolves external identities to leads.
///
/// The resolver and the reconciliation engine are the only components that
/// write lead ownership or external-key fields.
#[derive(Clone)]
pub struct IdentityResolver {
    db: Database,
}

impl IdentityResolver {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Resolve `(tenant, channel, external key)` to its unique lead,
    /// creating one if it does not exist.
    ///
    /// - The tenant must already have a designated owning user; otherwise the
    ///   event carries no usable context and resolution fails.
    /// - An existing lead's display name is filled from `fallback_display_name`
    ///   only when currently empty.
    /// - A racing duplicate creation loses against the unique index, and the
    ///   loser recovers by re-querying for the winner's row. The conflict is
    ///   never surfaced to the caller.
    pub async fn resolve(
        &self,
        tenant_id: &str,
        channel: Channel,
        external_key: &str,
        fallback_display_name: Option<&str>,
    ) -> Result<Lead, LeadhubError> {
        if external_key.trim().is_empty() {
            // Automated input never creates keyless leads; those exist only
            // through explicit manual creation.
            return Err(LeadhubError::Resolution(
                "empty external key in automated event".to_string(),
            ));
        }

        let owner = users::get_tenant_owner(&self.db, tenant_id)
            .await?
            .ok_or_else(|| {
                LeadhubError::Resolution(format!("no owning user for tenant '{tenant_id}'"))
            })?;

        if let Some(lead) = leads::find_by_key(&self.db, tenant_id, channel, external_key).await? {
            if lead.display_name.is_empty() {
                if let Some(name) = fallback_display_name.filter(|n| !n.is_empty()) {
                    leads::set_display_name_if_empty(&self.db, &lead.id, name).await?;
                    debug!(lead_id = %lead.id, "filled empty display name");
                    return leads::get_lead(&self.db, &lead.id).await?.ok_or_else(|| {
                        LeadhubError::Internal(format!("lead '{}' vanished mid-resolve", lead.id))
                    });
                }
            }
            return Ok(lead);
        }

        let now = now_rfc3339();
        let lead = Lead {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            owner_id: owner.id.clone(),
            display_name: fallback_display_name.unwrap_or_default().to_string(),
            email: None,
            status: LeadStatus::New,
            chat_user_id: (channel == Channel::Chat).then(|| external_key.to_string()),
            membership_id: (channel == Channel::Commerce).then(|| external_key.to_string()),
            customer_id: None,
            won_at: None,
            created_at: now.clone(),
            updated_at: now,
        };

        match leads::insert_lead(&self.db, &lead).await {
            Ok(()) => {
                info!(
                    tenant_id,
                    %channel,
                    lead_id = %lead.id,
                    "created lead for unseen external identity"
                );
                Ok(lead)
            }
            Err(err) if is_unique_violation(&err) => {
                // Lost the creation race; the other resolve's row is the
                // canonical one.
                debug!(tenant_id, %channel, "create conflict, re-querying");
                leads::find_by_key(&self.db, tenant_id, channel, external_key)
                    .await?
                    .ok_or_else(|| {
                        LeadhubError::Internal(
                            "unique conflict on insert but no row on re-query".to_string(),
                        )
                    })
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadhub_core::types::AppUser;
    use leadhub_storage::queries::users::create_user;
    use tempfile::tempdir;

    async fn setup() -> (IdentityResolver, Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        create_user(
            &db,
            &AppUser {
                id: "u1".to_string(),
                external_user_id: "owner-ext".to_string(),
                tenant_id: "t1".to_string(),
                display_name: "owner".to_string(),
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();
        (IdentityResolver::new(db.clone()), db, dir)
    }

    #[tokio::test]
    async fn creates_lead_on_first_contact() {
        let (resolver, db, _dir) = setup().await;

        let lead = resolver
            .resolve("t1", Channel::Chat, "u123", Some("Ada"))
            .await
            .unwrap();
        assert_eq!(lead.tenant_id, "t1");
        assert_eq!(lead.owner_id, "u1");
        assert_eq!(lead.chat_user_id.as_deref(), Some("u123"));
        assert!(lead.membership_id.is_none());
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.display_name, "Ada");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let (resolver, db, _dir) = setup().await;

        // Two identical resolves return the same lead and create one row.
        let first = resolver
            .resolve("t1", Channel::Chat, "u123", None)
            .await
            .unwrap();
        let second = resolver
            .resolve("t1", Channel::Chat, "u123", None)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let all = leadhub_storage::queries::leads::list_leads_for_tenant(&db, "t1")
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fills_display_name_only_when_empty() {
        let (resolver, db, _dir) = setup().await;

        let created = resolver
            .resolve("t1", Channel::Commerce, "mem-1", None)
            .await
            .unwrap();
        assert_eq!(created.display_name, "");

        let filled = resolver
            .resolve("t1", Channel::Commerce, "mem-1", Some("Grace"))
            .await
            .unwrap();
        assert_eq!(filled.display_name, "Grace");

        // Subsequent names never overwrite.
        let unchanged = resolver
            .resolve("t1", Channel::Commerce, "mem-1", Some("Someone Else"))
            .await
            .unwrap();
        assert_eq!(unchanged.display_name, "Grace");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn chat_and_commerce_keys_stay_independent() {
        let (resolver, db, _dir) = setup().await;

        // The same raw key on both channels is never auto-merged.
        let chat = resolver
            .resolve("t1", Channel::Chat, "shared-key", None)
            .await
            .unwrap();
        let commerce = resolver
            .resolve("t1", Channel::Commerce, "shared-key", None)
            .await
            .unwrap();
        assert_ne!(chat.id, commerce.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_tenant_is_rejected() {
        let (resolver, db, _dir) = setup().await;

        let err = resolver
            .resolve("t-unknown", Channel::Chat, "u123", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadhubError::Resolution(_)));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_key_is_rejected() {
        let (resolver, db, _dir) = setup().await;

        let err = resolver
            .resolve("t1", Channel::Chat, "  ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadhubError::Resolution(_)));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_resolves_create_one_lead() {
        let (resolver, db, _dir) = setup().await;

        // Race ten resolves for the same identity; the unique index plus
        // retry-on-conflict must collapse them to one row.
        let mut handles = Vec::new();
        for _ in 0..10 {
            let r = resolver.clone();
            handles.push(tokio::spawn(async move {
                r.resolve("t1", Channel::Chat, "u-race", None).await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "all resolves must return the same lead");

        db.close().await.unwrap();
    }
}
