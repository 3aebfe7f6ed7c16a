// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint for the realtime relay.
//!
//! Clients subscribe to rooms and receive every relay frame emitted to them:
//!
//! - initial rooms via query string: `GET /ws?rooms=lead:l1,tenant:t1`
//! - additional rooms at runtime: `{"subscribe": "user:u1"}`
//!
//! Server -> client frames are the relay's JSON frames:
//! `{"room": "lead:l1", "event": "message", "payload": {...}}`.
//! A client subscribed to several rooms receives one copy per room.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::server::GatewayState;

/// Query parameters for the WebSocket handshake.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Comma-separated list of rooms to subscribe to immediately.
    #[serde(default)]
    rooms: String,
}

/// Runtime command from the client.
#[derive(Debug, Deserialize)]
struct WsCommand {
    subscribe: String,
}

/// Split the `rooms` query value into clean room names.
fn parse_rooms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<GatewayState>,
) -> Response {
    let rooms = parse_rooms(&params.rooms);
    ws.on_upgrade(move |socket| handle_socket(socket, state, rooms))
}

/// Forward one room's relay frames into the connection's outbound queue.
fn spawn_room_forwarder(
    state: &GatewayState,
    room: &str,
    tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    let mut rx = state.relay.subscribe(room);
    let room = room.to_string();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(frame) => {
                    let Ok(text) = serde_json::to_string(&frame) else {
                        continue;
                    };
                    if tx.send(text).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Slow consumer; drop the backlog and keep going.
                    warn!(room, missed, "websocket subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: GatewayState, rooms: Vec<String>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let mut forwarders: Vec<JoinHandle<()>> = rooms
        .iter()
        .map(|room| spawn_room_forwarder(&state, room, tx.clone()))
        .collect();
    debug!(count = forwarders.len(), "websocket connected");

    let sender_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let text_str: &str = &text;
                match serde_json::from_str::<WsCommand>(text_str) {
                    Ok(command) => {
                        debug!(room = %command.subscribe, "websocket subscribe");
                        forwarders.push(spawn_room_forwarder(
                            &state,
                            &command.subscribe,
                            tx.clone(),
                        ));
                    }
                    Err(e) => warn!("invalid websocket command: {e}"),
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    for task in forwarders {
        task.abort();
    }
    sender_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooms_parse_with_whitespace_and_empties() {
        assert_eq!(
            parse_rooms("lead:l1, tenant:t1 ,,user:u1"),
            vec!["lead:l1", "tenant:t1", "user:u1"]
        );
        assert!(parse_rooms("").is_empty());
    }

    #[test]
    fn subscribe_command_deserializes() {
        let command: WsCommand = serde_json::from_str(r#"{"subscribe": "lead:l9"}"#).unwrap();
        assert_eq!(command.subscribe, "lead:l9");
    }
}
