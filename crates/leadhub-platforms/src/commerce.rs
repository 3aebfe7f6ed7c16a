// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST client for the commerce platform (memberships and customers).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use leadhub_config::model::CommerceConfig;
use leadhub_core::types::{CommerceUser, MembershipRecord};
use leadhub_core::{Capability, CommerceCapability, LeadhubError};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct MembershipPage {
    data: Vec<Membership>,
}

#[derive(Deserialize)]
struct Membership {
    id: String,
    /// Null for incomplete checkouts.
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct UserProfile {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

/// Commerce capability over the platform's REST API.
#[derive(Debug)]
pub struct HttpCommerceCapability {
    client: reqwest::Client,
    base_url: String,
    active: AtomicBool,
}

impl HttpCommerceCapability {
    pub fn new(config: &CommerceConfig) -> Result<Self, LeadhubError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| LeadhubError::Config("commerce.api_key is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| LeadhubError::Config(format!("invalid commerce API key: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LeadhubError::Platform {
                message: format!("failed to build commerce HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            active: AtomicBool::new(false),
        })
    }

    /// GET a URL, retrying once on a transient status.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        context: &str,
        url: &str,
    ) -> Result<T, LeadhubError> {
        for attempt in 0..=1 {
            if attempt > 0 {
                warn!(context, "retrying after transient commerce API error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| LeadhubError::Platform {
                    message: format!("{context}: request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;
            let status = response.status();
            debug!(context, status = %status, attempt, "commerce API response");
            if status.is_success() {
                return response.json().await.map_err(|e| LeadhubError::Platform {
                    message: format!("{context}: bad response body: {e}"),
                    source: Some(Box::new(e)),
                });
            }
            if !(crate::is_transient(status) && attempt == 0) {
                return Err(crate::response_error(context, response).await);
            }
        }
        unreachable!("retry loop always returns")
    }
}

#[async_trait]
impl Capability for HttpCommerceCapability {
    fn name(&self) -> &str {
        "commerce-http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn start(&self) -> Result<(), LeadhubError> {
        let url = format!("{}/me", self.base_url);
        let _: serde_json::Value = self.get_json("commerce identity check", &url).await?;
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), LeadhubError> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommerceCapability for HttpCommerceCapability {
    async fn list_memberships(&self, tenant_id: &str)
        -> Result<Vec<MembershipRecord>, LeadhubError> {
        let url = format!("{}/memberships?company_id={tenant_id}", self.base_url);
        let page: MembershipPage = self.get_json("commerce membership list", &url).await?;
        Ok(page
            .data
            .into_iter()
            .map(|m| MembershipRecord {
                membership_id: m.id,
                user_id: m.user_id,
            })
            .collect())
    }

    async fn get_user(&self, user_id: &str) -> Result<CommerceUser, LeadhubError> {
        let url = format!("{}/users/{user_id}", self.base_url);
        let profile: UserProfile = self.get_json("commerce user lookup", &url).await?;
        Ok(CommerceUser {
            email: profile.email,
            name: profile.name,
        })
    }

    async fn send_message(&self, user_id: &str, content: &str)
        -> Result<String, LeadhubError> {
        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "user_id": user_id, "content": content }))
            .send()
            .await
            .map_err(|e| LeadhubError::Platform {
                message: format!("commerce send: request failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !response.status().is_success() {
            return Err(crate::response_error("commerce send", response).await);
        }
        let sent: SentMessage = response.json().await.map_err(|e| LeadhubError::Platform {
            message: format!("commerce send: bad response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(sent.id)
    }
}
