// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast-backed realtime relay.
//!
//! Each room is a `tokio::sync::broadcast` channel created lazily on first
//! subscribe. Emitting into a room nobody subscribed to is a no-op, not an
//! error; webhook processing never depends on connected clients.

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use leadhub_core::{LeadhubError, RealtimeTransport};

const ROOM_BUFFER: usize = 256;

/// One frame delivered to subscribers of a room.
#[derive(Debug, Clone, Serialize)]
pub struct RelayFrame {
    pub room: String,
    pub event: String,
    pub payload: serde_json::Value,
}

/// Room registry fanning emits out to broadcast subscribers.
#[derive(Default)]
pub struct Relay {
    rooms: DashMap<String, broadcast::Sender<RelayFrame>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a room, creating it if needed.
    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<RelayFrame> {
        self.rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_BUFFER).0)
            .subscribe()
    }

    /// Number of live subscribers across all rooms. Diagnostic only.
    pub fn subscriber_count(&self) -> usize {
        self.rooms.iter().map(|e| e.value().receiver_count()).sum()
    }
}

impl RealtimeTransport for Relay {
    fn emit(
        &self,
        room: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Result<(), LeadhubError> {
        if let Some(sender) = self.rooms.get(room) {
            let frame = RelayFrame {
                room: room.to_string(),
                event: event.to_string(),
                payload: payload.clone(),
            };
            // A send error only means every receiver is gone; that is fine.
            let delivered = sender.send(frame).unwrap_or(0);
            trace!(room, event, delivered, "relay emit");
        }
        Ok(())
    }
}
