// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead CRUD, key lookup, and merge operations.
//!
//! Key lookups and inserts are scoped by tenant; the schema's partial unique
//! indexes back every code path here, so a racing duplicate insert fails
//! closed instead of creating a second lead.

use leadhub_core::types::{Channel, LeadStatus};
use leadhub_core::LeadhubError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::Lead;

const LEAD_COLS: &str = "id, tenant_id, owner_id, display_name, email, status, \
     chat_user_id, membership_id, customer_id, won_at, created_at, updated_at";

fn row_to_lead(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    let status_raw: String = row.get(5)?;
    let status = status_raw.parse::<LeadStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Lead {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        owner_id: row.get(2)?,
        display_name: row.get(3)?,
        email: row.get(4)?,
        status,
        chat_user_id: row.get(6)?,
        membership_id: row.get(7)?,
        customer_id: row.get(8)?,
        won_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// The column holding a channel's external correlation key.
fn key_column(channel: Channel) -> &'static str {
    match channel {
        Channel::Chat => "chat_user_id",
        Channel::Commerce => "membership_id",
    }
}

/// Insert a new lead. A duplicate `(tenant, key)` insert fails with a unique
/// violation; callers recover via re-query (see `database::is_unique_violation`).
pub async fn insert_lead(db: &Database, lead: &Lead) -> Result<(), LeadhubError> {
    let l = lead.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO leads
                 (id, tenant_id, owner_id, display_name, email, status,
                  chat_user_id, membership_id, customer_id, won_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    l.id,
                    l.tenant_id,
                    l.owner_id,
                    l.display_name,
                    l.email,
                    l.status.to_string(),
                    l.chat_user_id,
                    l.membership_id,
                    l.customer_id,
                    l.won_at,
                    l.created_at,
                    l.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a lead by primary key.
pub async fn get_lead(db: &Database, id: &str) -> Result<Option<Lead>, LeadhubError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let lead = conn
                .query_row(
                    &format!("SELECT {LEAD_COLS} FROM leads WHERE id = ?1"),
                    params![id],
                    row_to_lead,
                )
                .optional()?;
            Ok(lead)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find the lead holding `key` as its external correlation key for `channel`
/// within a tenant.
pub async fn find_by_key(
    db: &Database,
    tenant_id: &str,
    channel: Channel,
    key: &str,
) -> Result<Option<Lead>, LeadhubError> {
    let tenant_id = tenant_id.to_string();
    let key = key.to_string();
    let column = key_column(channel);
    db.connection()
        .call(move |conn| {
            let lead = conn
                .query_row(
                    &format!(
                        "SELECT {LEAD_COLS} FROM leads
                         WHERE tenant_id = ?1 AND {column} = ?2"
                    ),
                    params![tenant_id, key],
                    row_to_lead,
                )
                .optional()?;
            Ok(lead)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fill in the display name only when the stored one is empty. A name the
/// operator typed in by hand is never overwritten by webhook data.
pub async fn set_display_name_if_empty(
    db: &Database,
    lead_id: &str,
    display_name: &str,
) -> Result<(), LeadhubError> {
    let lead_id = lead_id.to_string();
    let display_name = display_name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET display_name = ?2,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND display_name = ''",
                params![lead_id, display_name],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fill in the email only when none is stored. Same rule as display names:
/// operator-entered contact data wins over platform profile data.
pub async fn set_email_if_empty(
    db: &Database,
    lead_id: &str,
    email: &str,
) -> Result<(), LeadhubError> {
    let lead_id = lead_id.to_string();
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET email = ?2,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND email IS NULL",
                params![lead_id, email],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record the commerce customer id on first sight. The customer id is a
/// correlation key only, never a resolution key, so it is written once and
/// left alone afterwards.
pub async fn attach_customer(
    db: &Database,
    lead_id: &str,
    customer_id: &str,
) -> Result<(), LeadhubError> {
    let lead_id = lead_id.to_string();
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET customer_id = ?2,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND customer_id IS NULL",
                params![lead_id, customer_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set a lead's lifecycle status, stamping `won_at` when it becomes won.
pub async fn set_status(
    db: &Database,
    lead_id: &str,
    status: LeadStatus,
) -> Result<(), LeadhubError> {
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            if status == LeadStatus::Won {
                conn.execute(
                    "UPDATE leads SET status = ?2,
                       won_at = COALESCE(won_at, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                       updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1",
                    params![lead_id, status.to_string()],
                )?;
            } else {
                conn.execute(
                    "UPDATE leads SET status = ?2,
                       updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1",
                    params![lead_id, status.to_string()],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All leads in a tenant, oldest first.
pub async fn list_leads_for_tenant(
    db: &Database,
    tenant_id: &str,
) -> Result<Vec<Lead>, LeadhubError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLS} FROM leads
                 WHERE tenant_id = ?1 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![tenant_id], row_to_lead)?;
            let mut leads = Vec::new();
            for row in rows {
                leads.push(row?);
            }
            Ok(leads)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Groups of leads in a tenant that share the same external key for a
/// channel. Each group is ordered oldest first (the merge survivor leads).
///
/// A healthy database returns no groups: the partial unique index forbids
/// new duplicates. Groups only exist as historical corruption predating the
/// constraint, which is exactly what reconciliation repairs.
pub async fn duplicate_key_groups(
    db: &Database,
    tenant_id: &str,
    channel: Channel,
) -> Result<Vec<Vec<Lead>>, LeadhubError> {
    let tenant_id = tenant_id.to_string();
    let column = key_column(channel);
    db.connection()
        .call(move |conn| {
            let mut keys_stmt = conn.prepare(&format!(
                "SELECT {column} FROM leads
                 WHERE tenant_id = ?1 AND {column} IS NOT NULL
                 GROUP BY {column} HAVING COUNT(*) > 1
                 ORDER BY {column} ASC"
            ))?;
            let keys: Vec<String> = keys_stmt
                .query_map(params![tenant_id.clone()], |row| row.get(0))?
                .collect::<Result<_, _>>()?;

            let mut groups = Vec::new();
            let mut group_stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLS} FROM leads
                 WHERE tenant_id = ?1 AND {column} = ?2
                 ORDER BY created_at ASC, id ASC"
            ))?;
            for key in keys {
                let rows = group_stmt.query_map(params![tenant_id.clone(), key], row_to_lead)?;
                let mut group = Vec::new();
                for row in rows {
                    group.push(row?);
                }
                groups.push(group);
            }
            Ok(groups)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Merge duplicate leads into a survivor inside one transaction.
///
/// Every message owned by a loser is re-pointed at the survivor (both
/// `lead_id` and `owner_id` rewritten to the survivor's values), then the
/// loser rows are deleted. Returns the number of messages re-owned.
pub async fn merge_leads(
    db: &Database,
    survivor_id: &str,
    loser_ids: &[String],
) -> Result<i64, LeadhubError> {
    let survivor_id = survivor_id.to_string();
    let loser_ids = loser_ids.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let survivor_owner: String = tx.query_row(
                "SELECT owner_id FROM leads WHERE id = ?1",
                params![survivor_id],
                |row| row.get(0),
            )?;

            let mut reowned: i64 = 0;
            for loser in &loser_ids {
                reowned += tx.execute(
                    "UPDATE messages SET lead_id = ?1, owner_id = ?2 WHERE lead_id = ?3",
                    params![survivor_id, survivor_owner, loser],
                )? as i64;
                tx.execute("DELETE FROM leads WHERE id = ?1", params![loser])?;
            }

            tx.commit()?;
            Ok(reowned)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Misattributed "self-leads" in a tenant: leads whose chat key is an
/// `AppUser`'s own chat identity in a *different* tenant, where that user is
/// not the lead's declared owner. A chat user must never be their own lead.
pub async fn find_self_leads(db: &Database, tenant_id: &str) -> Result<Vec<Lead>, LeadhubError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT DISTINCT l.id, l.tenant_id, l.owner_id, l.display_name, l.email,
                        l.status, l.chat_user_id, l.membership_id, l.customer_id,
                        l.won_at, l.created_at, l.updated_at
                 FROM leads l
                 JOIN app_users u
                   ON u.external_user_id = l.chat_user_id
                  AND u.tenant_id != l.tenant_id
                  AND u.id != l.owner_id
                 WHERE l.tenant_id = ?1 AND l.chat_user_id IS NOT NULL
                 ORDER BY l.created_at ASC",
            ))?;
            let rows = stmt.query_map(params![tenant_id], row_to_lead)?;
            let mut leads = Vec::new();
            for row in rows {
                leads.push(row?);
            }
            Ok(leads)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a lead together with all of its messages, in one transaction.
/// Returns the number of messages removed.
pub async fn delete_lead_with_messages(
    db: &Database,
    lead_id: &str,
) -> Result<i64, LeadhubError> {
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let removed =
                tx.execute("DELETE FROM messages WHERE lead_id = ?1", params![lead_id])? as i64;
            tx.execute("DELETE FROM leads WHERE id = ?1", params![lead_id])?;
            tx.commit()?;
            Ok(removed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::is_unique_violation;
    use crate::models::AppUser;
    use crate::queries::users::create_user;
    use tempfile::tempdir;

    pub(crate) fn make_lead(id: &str, tenant: &str, owner: &str, created_at: &str) -> Lead {
        Lead {
            id: id.to_string(),
            tenant_id: tenant.to_string(),
            owner_id: owner.to_string(),
            display_name: String::new(),
            email: None,
            status: LeadStatus::New,
            chat_user_id: None,
            membership_id: None,
            customer_id: None,
            won_at: None,
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let user = AppUser {
            id: "u1".to_string(),
            external_user_id: "owner-ext".to_string(),
            tenant_id: "t1".to_string(),
            display_name: "owner".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        create_user(&db, &user).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn insert_and_find_by_chat_key() {
        let (db, _dir) = setup_db().await;
        let mut lead = make_lead("l1", "t1", "u1", "2026-01-01T00:00:00.000Z");
        lead.chat_user_id = Some("u123".to_string());
        insert_lead(&db, &lead).await.unwrap();

        let found = find_by_key(&db, "t1", Channel::Chat, "u123").await.unwrap();
        assert_eq!(found.unwrap().id, "l1");

        // Key scoping is per tenant.
        let other_tenant = find_by_key(&db, "t2", Channel::Chat, "u123").await.unwrap();
        assert!(other_tenant.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_chat_key_in_tenant_fails_closed() {
        let (db, _dir) = setup_db().await;
        let mut l1 = make_lead("l1", "t1", "u1", "2026-01-01T00:00:00.000Z");
        l1.chat_user_id = Some("u123".to_string());
        insert_lead(&db, &l1).await.unwrap();

        let mut l2 = make_lead("l2", "t1", "u1", "2026-01-01T00:00:01.000Z");
        l2.chat_user_id = Some("u123".to_string());
        let err = insert_lead(&db, &l2).await.unwrap_err();
        assert!(is_unique_violation(&err), "expected unique violation: {err}");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn keyless_leads_are_unconstrained() {
        let (db, _dir) = setup_db().await;
        // Five manual leads with no external key in one tenant.
        for i in 0..5 {
            let lead = make_lead(&format!("manual-{i}"), "t1", "u1", "2026-01-01T00:00:00.000Z");
            insert_lead(&db, &lead).await.unwrap();
        }
        assert_eq!(list_leads_for_tenant(&db, "t1").await.unwrap().len(), 5);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn display_name_fill_only_when_empty() {
        let (db, _dir) = setup_db().await;
        let lead = make_lead("l1", "t1", "u1", "2026-01-01T00:00:00.000Z");
        insert_lead(&db, &lead).await.unwrap();

        set_display_name_if_empty(&db, "l1", "Ada").await.unwrap();
        assert_eq!(get_lead(&db, "l1").await.unwrap().unwrap().display_name, "Ada");

        // Second fill is a no-op: the name is no longer empty.
        set_display_name_if_empty(&db, "l1", "Grace").await.unwrap();
        assert_eq!(get_lead(&db, "l1").await.unwrap().unwrap().display_name, "Ada");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_status_won_stamps_won_at_once() {
        let (db, _dir) = setup_db().await;
        insert_lead(&db, &make_lead("l1", "t1", "u1", "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();

        set_status(&db, "l1", LeadStatus::Won).await.unwrap();
        let won_at = get_lead(&db, "l1").await.unwrap().unwrap().won_at;
        assert!(won_at.is_some());

        // Setting won again keeps the original timestamp.
        set_status(&db, "l1", LeadStatus::Won).await.unwrap();
        assert_eq!(get_lead(&db, "l1").await.unwrap().unwrap().won_at, won_at);

        db.close().await.unwrap();
    }
}
