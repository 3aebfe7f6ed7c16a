// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway: webhook ingress and the realtime WebSocket relay.
//!
//! Webhook endpoints always acknowledge with 200 for payloads the engine
//! chose not to process (missing identity, replayed message); only genuine
//! internal failures surface as 500. An external platform treats any
//! non-success as "retry later", so answering 4xx to an unprocessable
//! payload would make it redeliver the same event forever.

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{build_router, start_server, GatewayState};
