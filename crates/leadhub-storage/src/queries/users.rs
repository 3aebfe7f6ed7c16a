// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! App user CRUD operations.

use leadhub_core::LeadhubError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::AppUser;

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppUser> {
    Ok(AppUser {
        id: row.get(0)?,
        external_user_id: row.get(1)?,
        tenant_id: row.get(2)?,
        display_name: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const USER_COLS: &str = "id, external_user_id, tenant_id, display_name, created_at";

/// Insert a new app user. Fails on a duplicate (external id, tenant) pair.
pub async fn create_user(db: &Database, user: &AppUser) -> Result<(), LeadhubError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO app_users (id, external_user_id, tenant_id, display_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id,
                    user.external_user_id,
                    user.tenant_id,
                    user.display_name,
                    user.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a user by primary key.
pub async fn get_user(db: &Database, id: &str) -> Result<Option<AppUser>, LeadhubError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {USER_COLS} FROM app_users WHERE id = ?1"),
                    params![id],
                    row_to_user,
                )
                .optional()?;
            Ok(user)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a user by (external platform user id, tenant).
pub async fn get_user_by_external(
    db: &Database,
    external_user_id: &str,
    tenant_id: &str,
) -> Result<Option<AppUser>, LeadhubError> {
    let external_user_id = external_user_id.to_string();
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let user = conn
                .query_row(
                    &format!(
                        "SELECT {USER_COLS} FROM app_users
                         WHERE external_user_id = ?1 AND tenant_id = ?2"
                    ),
                    params![external_user_id, tenant_id],
                    row_to_user,
                )
                .optional()?;
            Ok(user)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The tenant's designated owning user: the earliest-created account in the
/// tenant. New leads resolved for the tenant are attributed to this user.
pub async fn get_tenant_owner(
    db: &Database,
    tenant_id: &str,
) -> Result<Option<AppUser>, LeadhubError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let user = conn
                .query_row(
                    &format!(
                        "SELECT {USER_COLS} FROM app_users
                         WHERE tenant_id = ?1
                         ORDER BY created_at ASC, id ASC
                         LIMIT 1"
                    ),
                    params![tenant_id],
                    row_to_user,
                )
                .optional()?;
            Ok(user)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All users in a tenant, oldest first.
pub async fn list_users_for_tenant(
    db: &Database,
    tenant_id: &str,
) -> Result<Vec<AppUser>, LeadhubError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM app_users
                 WHERE tenant_id = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![tenant_id], row_to_user)?;
            let mut users = Vec::new();
            for row in rows {
                users.push(row?);
            }
            Ok(users)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::is_unique_violation;
    use tempfile::tempdir;

    fn make_user(id: &str, external: &str, tenant: &str, created_at: &str) -> AppUser {
        AppUser {
            id: id.to_string(),
            external_user_id: external.to_string(),
            tenant_id: tenant.to_string(),
            display_name: format!("user {id}"),
            created_at: created_at.to_string(),
        }
    }

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn create_and_fetch_user() {
        let (db, _dir) = setup_db().await;
        let user = make_user("u1", "ext-1", "t1", "2026-01-01T00:00:00.000Z");
        create_user(&db, &user).await.unwrap();

        let fetched = get_user(&db, "u1").await.unwrap().unwrap();
        assert_eq!(fetched, user);

        let by_ext = get_user_by_external(&db, "ext-1", "t1").await.unwrap();
        assert_eq!(by_ext.unwrap().id, "u1");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_external_id_allowed_across_tenants_not_within() {
        let (db, _dir) = setup_db().await;
        create_user(&db, &make_user("u1", "ext-1", "t1", "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        // Same external identity in a different tenant is legitimate.
        create_user(&db, &make_user("u2", "ext-1", "t2", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        // Same (external id, tenant) pair is not.
        let err = create_user(&db, &make_user("u3", "ext-1", "t1", "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn tenant_owner_is_earliest_created() {
        let (db, _dir) = setup_db().await;
        create_user(&db, &make_user("u2", "ext-2", "t1", "2026-01-02T00:00:00.000Z"))
            .await
            .unwrap();
        create_user(&db, &make_user("u1", "ext-1", "t1", "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();

        let owner = get_tenant_owner(&db, "t1").await.unwrap().unwrap();
        assert_eq!(owner.id, "u1");

        assert!(get_tenant_owner(&db, "t9").await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
