// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use leadhub_core::LeadhubError;
use tracing::debug;

/// Async handle to the Leadhub SQLite database.
///
/// Cheap to clone; all clones share one background connection thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, LeadhubError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e: rusqlite::Error| LeadhubError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(e) => e,
                other => LeadhubError::Storage {
                    source: Box::new(other),
                },
            })?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL. Call before process exit.
    pub async fn close(&self) -> Result<(), LeadhubError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LeadhubError {
    LeadhubError::Storage {
        source: Box::new(e),
    }
}

/// Whether a storage error is a SQLite UNIQUE constraint violation.
///
/// The resolver relies on this to implement retry-on-conflict: a duplicate
/// key insert loses the race, is detected here, and is answered by a
/// re-query for the now-existing row.
pub fn is_unique_violation(err: &LeadhubError) -> bool {
    match err {
        LeadhubError::Storage { source } => {
            source.to_string().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_database_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        // All four domain tables must exist after migrations.
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('app_users', 'channel_bindings', 'leads', 'messages')",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 4);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_is_idempotent_across_restarts() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");

        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        drop(db);

        // Second open must not re-apply migrations or fail.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unique_violation_is_detectable() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("unique.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let insert = |db: &Database| {
            let conn = db.connection().clone();
            async move {
                conn.call(|conn| {
                    conn.execute(
                        "INSERT INTO app_users (id, external_user_id, tenant_id)
                         VALUES ('u1', 'ext-1', 't1')",
                        [],
                    )?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)
            }
        };

        insert(&db).await.unwrap();
        let err = insert(&db).await.unwrap_err();
        assert!(is_unique_violation(&err), "expected unique violation: {err}");

        db.close().await.unwrap();
    }
}
