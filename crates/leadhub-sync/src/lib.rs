// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Member and lead sync orchestration.
//!
//! Two batch imports share one shape: pull a record list from an external
//! platform, push each record through the identity resolver, and report
//! aggregate counts. Per-record failures are collected into the report and
//! never abort the remaining batch; partial success is the expected terminal
//! state against a flaky external API.
//!
//! Commerce memberships become *won* leads (a paid membership is a closed
//! deal). Chat guild members become *new* leads. Neither import ever moves a
//! lead's status backward.

use std::sync::Arc;

use leadhub_binding::BindingValidator;
use leadhub_core::types::{Channel, LeadStatus};
use leadhub_core::{ChatCapability, CommerceCapability, LeadhubError};
use leadhub_resolver::IdentityResolver;
use leadhub_storage::queries::{bindings, leads, users};
use leadhub_storage::Database;
use serde::Serialize;
use tracing::{info, warn};

/// Aggregate outcome of one sync batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Runs batch imports from the external platforms into the lead store.
pub struct MemberSyncOrchestrator {
    db: Database,
    resolver: IdentityResolver,
    validator: BindingValidator,
    chat: Arc<dyn ChatCapability>,
    commerce: Arc<dyn CommerceCapability>,
    validate_binding: bool,
}

impl MemberSyncOrchestrator {
    pub fn new(
        db: Database,
        chat: Arc<dyn ChatCapability>,
        commerce: Arc<dyn CommerceCapability>,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(db.clone()),
            validator: BindingValidator::new(db.clone(), chat.clone()),
            db,
            chat,
            commerce,
            validate_binding: true,
        }
    }

    /// Skip binding validation before guild imports. An operator escape hatch
    /// for platforms whose guild listing is temporarily broken; the import
    /// then trusts the stored guild id as-is.
    pub fn with_binding_validation(mut self, validate: bool) -> Self {
        self.validate_binding = validate;
        self
    }

    /// Import a tenant's commerce memberships as won leads.
    ///
    /// - A membership without a user id is counted `skipped`; it cannot be
    ///   enriched with a profile and usually means an unfinished checkout.
    /// - A new lead is created `won` with `won_at` stamped.
    /// - An existing lead is upgraded to `won` only from a lower status,
    ///   never downgraded; an already-won lead counts `skipped`.
    pub async fn sync_members(&self, tenant_id: &str) -> Result<SyncResult, LeadhubError> {
        let records = self.commerce.list_memberships(tenant_id).await?;
        let mut result = SyncResult {
            total: records.len(),
            ..SyncResult::default()
        };

        for record in records {
            let Some(user_id) = record.user_id.as_deref() else {
                result.skipped += 1;
                continue;
            };

            let profile = match self.commerce.get_user(user_id).await {
                Ok(profile) => profile,
                Err(e) => {
                    warn!(membership_id = %record.membership_id, error = %e, "profile lookup failed");
                    result
                        .errors
                        .push(format!("membership '{}': {e}", record.membership_id));
                    continue;
                }
            };

            let existing = match leads::find_by_key(
                &self.db,
                tenant_id,
                Channel::Commerce,
                &record.membership_id,
            )
            .await
            {
                Ok(existing) => existing,
                Err(e) => {
                    result
                        .errors
                        .push(format!("membership '{}': {e}", record.membership_id));
                    continue;
                }
            };

            let lead = match self
                .resolver
                .resolve(
                    tenant_id,
                    Channel::Commerce,
                    &record.membership_id,
                    profile.name.as_deref(),
                )
                .await
            {
                Ok(lead) => lead,
                Err(e) => {
                    result
                        .errors
                        .push(format!("membership '{}': {e}", record.membership_id));
                    continue;
                }
            };

            let enrich = async {
                leads::attach_customer(&self.db, &lead.id, user_id).await?;
                if let Some(email) = profile.email.as_deref() {
                    leads::set_email_if_empty(&self.db, &lead.id, email).await?;
                }
                Ok::<(), LeadhubError>(())
            };
            if let Err(e) = enrich.await {
                warn!(membership_id = %record.membership_id, error = %e, "lead enrichment failed");
                result
                    .errors
                    .push(format!("membership '{}': {e}", record.membership_id));
                continue;
            }

            match existing {
                None => {
                    leads::set_status(&self.db, &lead.id, LeadStatus::Won).await?;
                    result.created += 1;
                }
                Some(prior) if prior.status.rank() < LeadStatus::Won.rank() => {
                    leads::set_status(&self.db, &lead.id, LeadStatus::Won).await?;
                    result.updated += 1;
                }
                Some(_) => {
                    // Already won; nothing to change.
                    result.skipped += 1;
                }
            }
        }

        info!(
            tenant_id,
            total = result.total,
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            errors = result.errors.len(),
            "membership sync finished"
        );
        Ok(result)
    }

    /// Import the bound guild's member list as chat-keyed leads.
    ///
    /// Short-circuits with [`LeadhubError::StaleBinding`] when the user's
    /// binding fails validation; syncing an inaccessible guild would silently
    /// import nothing. On success the binding's member counter and
    /// `last_synced_at` are stamped.
    pub async fn sync_guild_members(&self, user_id: &str) -> Result<SyncResult, LeadhubError> {
        let user = users::get_user(&self.db, user_id).await?.ok_or_else(|| {
            LeadhubError::Resolution(format!("no app user '{user_id}'"))
        })?;
        let binding = bindings::get_binding_for_user(&self.db, user_id)
            .await?
            .ok_or_else(|| {
                LeadhubError::Resolution(format!("user '{user_id}' has no chat binding"))
            })?;
        if self.validate_binding {
            self.validator.ensure_valid(&binding).await?;
        }

        let guild_id = binding.guild_id.as_deref().ok_or_else(|| {
            LeadhubError::Resolution(format!("binding '{}' has no bound guild", binding.id))
        })?;

        let members = self.chat.list_guild_members(guild_id).await?;
        let mut result = SyncResult {
            total: members.len(),
            ..SyncResult::default()
        };

        for member in &members {
            let existing = match leads::find_by_key(
                &self.db,
                &user.tenant_id,
                Channel::Chat,
                &member.user_id,
            )
            .await
            {
                Ok(existing) => existing,
                Err(e) => {
                    result
                        .errors
                        .push(format!("member '{}': {e}", member.user_id));
                    continue;
                }
            };

            match self
                .resolver
                .resolve(
                    &user.tenant_id,
                    Channel::Chat,
                    &member.user_id,
                    Some(&member.username),
                )
                .await
            {
                Ok(_) if existing.is_none() => result.created += 1,
                Ok(_) => result.skipped += 1,
                Err(e) => {
                    result
                        .errors
                        .push(format!("member '{}': {e}", member.user_id));
                }
            }
        }

        bindings::touch_sync(&self.db, &binding.id, members.len() as i64, binding.channel_count)
            .await?;

        info!(
            user_id,
            guild_id,
            total = result.total,
            created = result.created,
            skipped = result.skipped,
            errors = result.errors.len(),
            "guild member sync finished"
        );
        Ok(result)
    }
}
