// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadhub serve` command implementation.
//!
//! Wires the storage layer, platform capabilities, message router, and relay
//! into the gateway server, then runs until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use leadhub_config::model::LeadhubConfig;
use leadhub_core::LeadhubError;
use leadhub_gateway::{start_server, GatewayState};
use leadhub_resolver::IdentityResolver;
use leadhub_routing::{MessageRouter, Relay};
use leadhub_storage::Database;
use tracing::{info, warn};

use crate::shutdown;

pub async fn run_serve(config: LeadhubConfig) -> Result<(), LeadhubError> {
    info!("starting leadhub serve");

    let db = Database::open(&config.storage.database_path).await?;

    let chat = leadhub_platforms::chat_capability(&config.chat)?;
    let commerce = leadhub_platforms::commerce_capability(&config.commerce)?;
    if let Err(e) = chat.start().await {
        warn!(error = %e, "chat capability failed to start; continuing without it");
    }
    if let Err(e) = commerce.start().await {
        warn!(error = %e, "commerce capability failed to start; continuing without it");
    }

    let relay = Arc::new(Relay::new());
    let send_timeout = Duration::from_secs(
        config.chat.request_timeout_secs.max(config.commerce.request_timeout_secs),
    );
    let router = MessageRouter::new(
        db.clone(),
        IdentityResolver::new(db.clone()),
        relay.clone(),
        chat.clone(),
        commerce.clone(),
        send_timeout,
    );

    let state = GatewayState {
        router: Arc::new(router),
        relay,
        start_time: std::time::Instant::now(),
    };

    let cancel = shutdown::install_signal_handler();
    tokio::select! {
        result = start_server(&config.gateway, state) => result?,
        _ = cancel.cancelled() => {
            info!("shutdown requested, stopping gateway");
        }
    }

    chat.stop().await?;
    commerce.stop().await?;
    db.close().await?;
    info!("leadhub serve shutdown complete");
    Ok(())
}
