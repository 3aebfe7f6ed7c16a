// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime transport trait for relaying resolved messages to clients.

use crate::error::LeadhubError;

/// Room-addressed fan-out to connected clients.
///
/// Rooms are plain strings (`lead:<id>`, `user:<id>`, `tenant:<id>`). A
/// client subscribed to several rooms receives one copy per room; the routing
/// layer emits to each granularity exactly once per message.
pub trait RealtimeTransport: Send + Sync + 'static {
    /// Emit a named event to every subscriber of `room`.
    ///
    /// Emitting to a room with no subscribers is not an error.
    fn emit(&self, room: &str, event: &str, payload: &serde_json::Value)
        -> Result<(), LeadhubError>;
}
