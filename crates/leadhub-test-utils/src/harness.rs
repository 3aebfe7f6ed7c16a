// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-database setup and tenant seeding.

use leadhub_core::types::AppUser;
use leadhub_storage::queries::users;
use leadhub_storage::Database;

/// Open a fresh migrated database in a temp directory.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub async fn open_temp_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("leadhub-test.db");
    let db = Database::open(db_path.to_str().unwrap())
        .await
        .expect("open test database");
    (db, dir)
}

/// Seed a tenant with its designated owning user and return the user.
pub async fn seed_tenant(db: &Database, tenant_id: &str, user_id: &str, external_id: &str) -> AppUser {
    let user = AppUser {
        id: user_id.to_string(),
        external_user_id: external_id.to_string(),
        tenant_id: tenant_id.to_string(),
        display_name: format!("owner of {tenant_id}"),
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
    };
    users::create_user(db, &user).await.expect("seed tenant owner");
    user
}
