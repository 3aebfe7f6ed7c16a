// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits abstracting the external collaborators.
//!
//! The engine never talks to a platform SDK directly. It receives one
//! explicitly-owned capability object per platform at construction time
//! (no process-wide singletons) and calls through these traits.

pub mod capability;
pub mod chat;
pub mod commerce;
pub mod realtime;

pub use capability::Capability;
pub use chat::ChatCapability;
pub use commerce::CommerceCapability;
pub use realtime::RealtimeTransport;
