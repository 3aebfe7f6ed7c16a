// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use leadhub_config::model::GatewayConfig;
use leadhub_core::LeadhubError;
use leadhub_routing::{MessageRouter, Relay};
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Routes inbound webhook events to storage and the relay.
    pub router: Arc<MessageRouter>,
    /// Room registry WebSocket clients subscribe against.
    pub relay: Arc<Relay>,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Build the gateway route tree.
///
/// Separated from [`start_server`] so tests can drive it with
/// `tower::ServiceExt::oneshot` instead of a bound socket.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/webhooks/chat", post(handlers::post_chat_webhook))
        .route("/webhooks/commerce", post(handlers::post_commerce_webhook))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP/WebSocket server on the configured address.
pub async fn start_server(config: &GatewayConfig, state: GatewayState) -> Result<(), LeadhubError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LeadhubError::Platform {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| LeadhubError::Platform {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
