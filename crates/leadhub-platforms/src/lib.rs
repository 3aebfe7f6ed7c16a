// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-backed platform capabilities.
//!
//! Thin REST clients implementing [`leadhub_core::ChatCapability`] and
//! [`leadhub_core::CommerceCapability`]. Every request inherits a bounded
//! timeout from the client, so a hung platform API surfaces as a typed
//! failure instead of stalling a webhook handler. Retry policy is a single
//! retry on transient statuses (429, 5xx); anything beyond that belongs to
//! the caller's batch error handling.

pub mod chat;
pub mod commerce;
pub mod disabled;

pub use chat::HttpChatCapability;
pub use commerce::HttpCommerceCapability;
pub use disabled::{DisabledChat, DisabledCommerce};

use std::sync::Arc;

use leadhub_config::model::{ChatConfig, CommerceConfig};
use leadhub_core::{ChatCapability, CommerceCapability, LeadhubError};

/// Build the chat capability the config asks for: HTTP when a token is set,
/// a disabled stub otherwise.
pub fn chat_capability(config: &ChatConfig) -> Result<Arc<dyn ChatCapability>, LeadhubError> {
    if config.bot_token.is_some() {
        Ok(Arc::new(HttpChatCapability::new(config)?))
    } else {
        Ok(Arc::new(DisabledChat))
    }
}

/// Build the commerce capability the config asks for.
pub fn commerce_capability(
    config: &CommerceConfig,
) -> Result<Arc<dyn CommerceCapability>, LeadhubError> {
    if config.api_key.is_some() {
        Ok(Arc::new(HttpCommerceCapability::new(config)?))
    } else {
        Ok(Arc::new(DisabledCommerce))
    }
}

/// Statuses worth one retry before giving up.
pub(crate) fn is_transient(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

/// Map a failed response into a platform error carrying the body text.
pub(crate) async fn response_error(context: &str, response: reqwest::Response) -> LeadhubError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    LeadhubError::Platform {
        message: format!("{context}: {status}: {body}"),
        source: None,
    }
}
