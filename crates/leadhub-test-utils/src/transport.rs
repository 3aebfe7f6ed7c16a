// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime transport double that records every emit.

use std::sync::Mutex;

use leadhub_core::{LeadhubError, RealtimeTransport};

/// Records `(room, event, payload)` triples in emit order.
#[derive(Default)]
pub struct CollectingTransport {
    events: Mutex<Vec<(String, String, serde_json::Value)>>,
}

impl CollectingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded emits, in order.
    pub fn events(&self) -> Vec<(String, String, serde_json::Value)> {
        self.events.lock().unwrap().clone()
    }

    /// Rooms that received a given event name.
    pub fn rooms_for(&self, event: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e, _)| e == event)
            .map(|(room, _, _)| room.clone())
            .collect()
    }
}

impl RealtimeTransport for CollectingTransport {
    fn emit(
        &self,
        room: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Result<(), LeadhubError> {
        self.events
            .lock()
            .unwrap()
            .push((room.to_string(), event.to_string(), payload.clone()));
        Ok(())
    }
}
