// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Leadhub integration tests.
//!
//! Provides mock capabilities and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockChat`] - scripted chat capability (guilds, members, captured sends)
//! - [`MockCommerce`] - scripted commerce capability (memberships, users)
//! - [`CollectingTransport`] - realtime transport that records every emit
//! - [`harness`] - temp-database setup and tenant seeding

pub mod harness;
pub mod mock_chat;
pub mod mock_commerce;
pub mod transport;

pub use harness::{open_temp_db, seed_tenant};
pub use mock_chat::MockChat;
pub use mock_commerce::MockCommerce;
pub use transport::CollectingTransport;
