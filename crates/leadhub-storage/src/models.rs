// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `leadhub-core::types` for use across
//! crate boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use leadhub_core::types::{AppUser, Channel, ChannelBinding, Direction, Lead, LeadStatus, Message};
