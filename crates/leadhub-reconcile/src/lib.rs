// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Duplicate reconciliation engine.
//!
//! A batch, idempotent repair pass over one tenant's leads and messages. It
//! replaces the pile of one-off repair scripts this system historically
//! accumulated with a single reportable operation, invocable on demand or on
//! a schedule:
//!
//! 1. **Duplicate merge** — leads sharing an external key within the tenant
//!    are merged into the oldest lead; message history is re-owned, younger
//!    rows deleted.
//! 2. **Self-lead removal** — leads that are really an `AppUser`'s own chat
//!    identity leaked in from another tenant are deleted with their messages.
//! 3. **Ownership drift** — messages whose `owner_id` disagrees with their
//!    lead's current owner are rewritten; the lead's owner is authoritative.
//!
//! Each duplicate group is one checkpoint unit: a group's failure is logged
//! and skipped, and cancellation is honored between groups, never mid-merge.

use leadhub_core::types::Channel;
use leadhub_core::LeadhubError;
use leadhub_storage::queries::{leads, messages};
use leadhub_storage::Database;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Aggregate counts from one reconciliation run.
///
/// Invariant violations found here are expected input, not errors; only a
/// repair step that itself failed lands in `errors`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    pub tenant_id: String,
    /// Duplicate-key groups merged.
    pub groups_merged: u64,
    /// Non-survivor lead rows deleted by merges.
    pub leads_removed: u64,
    /// Messages re-pointed at a merge survivor.
    pub messages_reowned: u64,
    /// Misattributed self-leads deleted.
    pub self_leads_removed: u64,
    /// Messages deleted together with self-leads.
    pub self_lead_messages_removed: u64,
    /// Messages whose owner was rewritten to the lead's current owner.
    pub ownership_fixed: u64,
    /// True when the run stopped early at a cancellation checkpoint.
    pub cancelled: bool,
    /// Per-group repair failures; the run continues past them.
    pub errors: Vec<String>,
}

/// Batch repair engine for one tenant at a time.
#[derive(Clone)]
pub struct Reconciler {
    db: Database,
}

impl Reconciler {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Run all three repair passes over a tenant.
    ///
    /// Best-effort batch repair: a single group's failure is isolated and the
    /// remaining groups still run. Safe to re-run at any time.
    pub async fn reconcile_tenant(
        &self,
        tenant_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconciliationReport, LeadhubError> {
        let mut report = ReconciliationReport {
            tenant_id: tenant_id.to_string(),
            ..Default::default()
        };

        for channel in [Channel::Chat, Channel::Commerce] {
            if self.merge_duplicates(tenant_id, channel, cancel, &mut report).await? {
                return Ok(report);
            }
        }

        if self.remove_self_leads(tenant_id, cancel, &mut report).await? {
            return Ok(report);
        }

        report.ownership_fixed = messages::fix_owner_drift(&self.db, tenant_id).await? as u64;

        info!(
            tenant_id,
            groups_merged = report.groups_merged,
            messages_reowned = report.messages_reowned,
            self_leads_removed = report.self_leads_removed,
            ownership_fixed = report.ownership_fixed,
            "reconciliation complete"
        );
        Ok(report)
    }

    /// Merge every duplicate-key group for one channel. Returns `true` when
    /// the run was cancelled.
    async fn merge_duplicates(
        &self,
        tenant_id: &str,
        channel: Channel,
        cancel: &CancellationToken,
        report: &mut ReconciliationReport,
    ) -> Result<bool, LeadhubError> {
        let groups = leads::duplicate_key_groups(&self.db, tenant_id, channel).await?;

        for group in groups {
            // Checkpoint granularity is one group: stop here, never mid-merge.
            if cancel.is_cancelled() {
                report.cancelled = true;
                warn!(tenant_id, %channel, "reconciliation cancelled between groups");
                return Ok(true);
            }

            // Oldest lead wins: it has accumulated the most history and
            // external references.
            let survivor = &group[0];
            let losers: Vec<String> = group[1..].iter().map(|l| l.id.clone()).collect();

            match leads::merge_leads(&self.db, &survivor.id, &losers).await {
                Ok(reowned) => {
                    report.groups_merged += 1;
                    report.leads_removed += losers.len() as u64;
                    report.messages_reowned += reowned as u64;
                    info!(
                        tenant_id,
                        %channel,
                        survivor = %survivor.id,
                        merged = losers.len(),
                        reowned,
                        "merged duplicate lead group"
                    );
                }
                Err(e) => {
                    warn!(tenant_id, %channel, survivor = %survivor.id, error = %e, "group merge failed");
                    report
                        .errors
                        .push(format!("merge into '{}' failed: {e}", survivor.id));
                }
            }
        }
        Ok(false)
    }

    /// Delete misattributed self-leads with their messages. Returns `true`
    /// when the run was cancelled.
    async fn remove_self_leads(
        &self,
        tenant_id: &str,
        cancel: &CancellationToken,
        report: &mut ReconciliationReport,
    ) -> Result<bool, LeadhubError> {
        let self_leads = leads::find_self_leads(&self.db, tenant_id).await?;

        for lead in self_leads {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return Ok(true);
            }

            match leads::delete_lead_with_messages(&self.db, &lead.id).await {
                Ok(removed) => {
                    report.self_leads_removed += 1;
                    report.self_lead_messages_removed += removed as u64;
                    info!(
                        tenant_id,
                        lead_id = %lead.id,
                        chat_user_id = ?lead.chat_user_id,
                        messages_removed = removed,
                        "removed cross-tenant self-lead"
                    );
                }
                Err(e) => {
                    warn!(tenant_id, lead_id = %lead.id, error = %e, "self-lead removal failed");
                    report
                        .errors
                        .push(format!("self-lead '{}' removal failed: {e}", lead.id));
                }
            }
        }
        Ok(false)
    }
}
