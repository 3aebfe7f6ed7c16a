// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel binding CRUD operations.
//!
//! A binding is created on integration connect, invalidated when the bot
//! loses guild access, and deleted when the owning user disconnects.

use leadhub_core::LeadhubError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::ChannelBinding;

fn row_to_binding(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelBinding> {
    Ok(ChannelBinding {
        id: row.get(0)?,
        user_id: row.get(1)?,
        tenant_id: row.get(2)?,
        guild_id: row.get(3)?,
        guild_name: row.get(4)?,
        bot_user_id: row.get(5)?,
        is_active: row.get(6)?,
        last_synced_at: row.get(7)?,
        member_count: row.get(8)?,
        channel_count: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const BINDING_COLS: &str = "id, user_id, tenant_id, guild_id, guild_name, bot_user_id, \
     is_active, last_synced_at, member_count, channel_count, created_at, updated_at";

/// Insert a new binding. Fails if the user already owns one.
pub async fn create_binding(db: &Database, binding: &ChannelBinding) -> Result<(), LeadhubError> {
    let b = binding.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO channel_bindings
                 (id, user_id, tenant_id, guild_id, guild_name, bot_user_id,
                  is_active, last_synced_at, member_count, channel_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    b.id,
                    b.user_id,
                    b.tenant_id,
                    b.guild_id,
                    b.guild_name,
                    b.bot_user_id,
                    b.is_active,
                    b.last_synced_at,
                    b.member_count,
                    b.channel_count,
                    b.created_at,
                    b.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch the binding owned by a user, if any.
pub async fn get_binding_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Option<ChannelBinding>, LeadhubError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let binding = conn
                .query_row(
                    &format!("SELECT {BINDING_COLS} FROM channel_bindings WHERE user_id = ?1"),
                    params![user_id],
                    row_to_binding,
                )
                .optional()?;
            Ok(binding)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All bindings currently flagged active, across tenants. Used by the
/// validator's periodic sweep.
pub async fn list_active_bindings(db: &Database) -> Result<Vec<ChannelBinding>, LeadhubError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BINDING_COLS} FROM channel_bindings
                 WHERE is_active = 1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], row_to_binding)?;
            let mut bindings = Vec::new();
            for row in rows {
                bindings.push(row?);
            }
            Ok(bindings)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrite every mutable field of a binding.
pub async fn update_binding(db: &Database, binding: &ChannelBinding) -> Result<(), LeadhubError> {
    let b = binding.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE channel_bindings SET
                   guild_id = ?2, guild_name = ?3, bot_user_id = ?4, is_active = ?5,
                   last_synced_at = ?6, member_count = ?7, channel_count = ?8,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![
                    b.id,
                    b.guild_id,
                    b.guild_name,
                    b.bot_user_id,
                    b.is_active,
                    b.last_synced_at,
                    b.member_count,
                    b.channel_count,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Stamp a successful member sync: counters plus `last_synced_at = now`.
pub async fn touch_sync(
    db: &Database,
    binding_id: &str,
    member_count: i64,
    channel_count: i64,
) -> Result<(), LeadhubError> {
    let binding_id = binding_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE channel_bindings SET
                   member_count = ?2, channel_count = ?3,
                   last_synced_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![binding_id, member_count, channel_count],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove the binding owned by a user (integration disconnect).
pub async fn delete_binding_for_user(db: &Database, user_id: &str) -> Result<bool, LeadhubError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM channel_bindings WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppUser;
    use crate::queries::users::create_user;
    use tempfile::tempdir;

    async fn setup_db_with_user() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let user = AppUser {
            id: "u1".to_string(),
            external_user_id: "ext-1".to_string(),
            tenant_id: "t1".to_string(),
            display_name: "owner".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        create_user(&db, &user).await.unwrap();
        (db, dir)
    }

    fn make_binding(id: &str, user_id: &str) -> ChannelBinding {
        ChannelBinding {
            id: id.to_string(),
            user_id: user_id.to_string(),
            tenant_id: "t1".to_string(),
            guild_id: Some("g1".to_string()),
            guild_name: Some("Guild One".to_string()),
            bot_user_id: Some("bot-1".to_string()),
            is_active: true,
            last_synced_at: None,
            member_count: 0,
            channel_count: 0,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn create_fetch_update_binding() {
        let (db, _dir) = setup_db_with_user().await;
        create_binding(&db, &make_binding("b1", "u1")).await.unwrap();

        let mut binding = get_binding_for_user(&db, "u1").await.unwrap().unwrap();
        assert_eq!(binding.guild_id.as_deref(), Some("g1"));
        assert!(binding.is_active);

        binding.is_active = false;
        binding.guild_id = None;
        binding.guild_name = None;
        update_binding(&db, &binding).await.unwrap();

        let reread = get_binding_for_user(&db, "u1").await.unwrap().unwrap();
        assert!(!reread.is_active);
        assert!(reread.guild_id.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn one_binding_per_user() {
        let (db, _dir) = setup_db_with_user().await;
        create_binding(&db, &make_binding("b1", "u1")).await.unwrap();
        let err = create_binding(&db, &make_binding("b2", "u1")).await;
        assert!(err.is_err(), "second binding for same user must fail");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn touch_sync_updates_counters_and_timestamp() {
        let (db, _dir) = setup_db_with_user().await;
        create_binding(&db, &make_binding("b1", "u1")).await.unwrap();

        touch_sync(&db, "b1", 42, 7).await.unwrap();
        let binding = get_binding_for_user(&db, "u1").await.unwrap().unwrap();
        assert_eq!(binding.member_count, 42);
        assert_eq!(binding.channel_count, 7);
        assert!(binding.last_synced_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_binding_on_disconnect() {
        let (db, _dir) = setup_db_with_user().await;
        create_binding(&db, &make_binding("b1", "u1")).await.unwrap();

        assert!(delete_binding_for_user(&db, "u1").await.unwrap());
        assert!(get_binding_for_user(&db, "u1").await.unwrap().is_none());
        // Deleting again reports nothing removed.
        assert!(!delete_binding_for_user(&db, "u1").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn active_listing_skips_inactive() {
        let (db, _dir) = setup_db_with_user().await;
        let mut b = make_binding("b1", "u1");
        b.is_active = false;
        create_binding(&db, &b).await.unwrap();

        assert!(list_active_bindings(&db).await.unwrap().is_empty());

        db.close().await.unwrap();
    }
}
