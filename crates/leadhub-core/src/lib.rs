// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Leadhub CRM engine.
//!
//! This crate provides the foundational error type, domain model types, and
//! the capability traits that abstract the two external platforms (chat and
//! commerce) plus the realtime transport. All engine crates depend on this
//! one and nothing else in the workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LeadhubError;
pub use types::{Channel, Direction, LeadStatus};

// Re-export capability traits at crate root.
pub use traits::{Capability, ChatCapability, CommerceCapability, RealtimeTransport};
