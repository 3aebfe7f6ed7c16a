// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Leadhub CRM engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query operations for
//! app users, channel bindings, leads, and messages.
//!
//! The lead uniqueness invariants live in the schema as partial unique
//! indexes, not only in query logic; see `migrations/V1__initial_schema.sql`.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::{is_unique_violation, Database};
pub use models::*;
