// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST client for the chat platform (guild/DM based, Discord-style API).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use leadhub_config::model::ChatConfig;
use leadhub_core::types::GuildMember;
use leadhub_core::{Capability, ChatCapability, LeadhubError};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Deserialize)]
struct Guild {
    id: String,
}

#[derive(Deserialize)]
struct Member {
    user: MemberUser,
}

#[derive(Deserialize)]
struct MemberUser {
    id: String,
    username: String,
}

/// Chat capability over the platform's REST API.
///
/// Holds no connection state beyond the pooled HTTP client; `start`/`stop`
/// only gate `is_active`.
#[derive(Debug)]
pub struct HttpChatCapability {
    client: reqwest::Client,
    base_url: String,
    active: AtomicBool,
}

impl HttpChatCapability {
    pub fn new(config: &ChatConfig) -> Result<Self, LeadhubError> {
        let token = config
            .bot_token
            .as_deref()
            .ok_or_else(|| LeadhubError::Config("chat.bot_token is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|e| LeadhubError::Config(format!("invalid chat bot token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LeadhubError::Platform {
                message: format!("failed to build chat HTTP client: {e}"),
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
                warn!(context, "retrying after transient chat API error");
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
            debug!(context, status = %status, attempt, "chat API response");
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
impl Capability for HttpChatCapability {
    fn name(&self) -> &str {
        "chat-http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn start(&self) -> Result<(), LeadhubError> {
        // Token sanity check; a bad token should fail at startup, not on the
        // first webhook.
        let url = format!("{}/users/@me", self.base_url);
        let _: serde_json::Value = self.get_json("chat identity check", &url).await?;
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
impl ChatCapability for HttpChatCapability {
    async fn send_message(&self, channel_id: &str, content: &str)
        -> Result<String, LeadhubError> {
        let url = format!("{}/channels/{channel_id}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| LeadhubError::Platform {
                message: format!("chat send: request failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !response.status().is_success() {
            return Err(crate::response_error("chat send", response).await);
        }
        let sent: SentMessage = response.json().await.map_err(|e| LeadhubError::Platform {
            message: format!("chat send: bad response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(sent.id)
    }

    async fn list_accessible_guilds(&self) -> Result<HashSet<String>, LeadhubError> {
        let url = format!("{}/users/@me/guilds", self.base_url);
        let guilds: Vec<Guild> = self.get_json("chat guild list", &url).await?;
        Ok(guilds.into_iter().map(|g| g.id).collect())
    }

    async fn list_guild_members(&self, guild_id: &str)
        -> Result<Vec<GuildMember>, LeadhubError> {
        let url = format!("{}/guilds/{guild_id}/members?limit=1000", self.base_url);
        let members: Vec<Member> = self.get_json("chat member list", &url).await?;
        Ok(members
            .into_iter()
            .map(|m| GuildMember {
                user_id: m.user.id,
                username: m.user.username,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_capability(base: &str) -> HttpChatCapability {
        HttpChatCapability::new(&ChatConfig {
            bot_token: Some("test-token".to_string()),
            api_base: base.to_string(),
            request_timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let err = HttpChatCapability::new(&ChatConfig::default()).unwrap_err();
        assert!(matches!(err, LeadhubError::Config(_)));
    }

    #[tokio::test]
    async fn send_message_posts_content_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/c9/messages"))
            .and(header("authorization", "Bot test-token"))
            .and(body_json(serde_json::json!({"content": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "555", "content": "hello"
            })))
            .mount(&server)
            .await;

        let capability = test_capability(&server.uri());
        let id = capability.send_message("c9", "hello").await.unwrap();
        assert_eq!(id, "555");
    }

    #[tokio::test]
    async fn send_failure_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/c9/messages"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Missing Access"))
            .mount(&server)
            .await;

        let capability = test_capability(&server.uri());
        let err = capability.send_message("c9", "hello").await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("403"), "got: {text}");
        assert!(text.contains("Missing Access"), "got: {text}");
    }

    #[tokio::test]
    async fn guild_list_becomes_id_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me/guilds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "g1", "name": "One"},
                {"id": "g2", "name": "Two"}
            ])))
            .mount(&server)
            .await;

        let capability = test_capability(&server.uri());
        let guilds = capability.list_accessible_guilds().await.unwrap();
        assert_eq!(guilds, HashSet::from(["g1".to_string(), "g2".to_string()]));
    }

    #[tokio::test]
    async fn guild_list_retries_once_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me/guilds"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/@me/guilds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "g1", "name": "One"}
            ])))
            .mount(&server)
            .await;

        let capability = test_capability(&server.uri());
        let guilds = capability.list_accessible_guilds().await.unwrap();
        assert_eq!(guilds.len(), 1);
    }

    #[tokio::test]
    async fn member_list_flattens_nested_users() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guilds/g1/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"user": {"id": "m1", "username": "alpha"}},
                {"user": {"id": "m2", "username": "beta"}}
            ])))
            .mount(&server)
            .await;

        let capability = test_capability(&server.uri());
        let members = capability.list_guild_members("g1").await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].user_id, "m1");
        assert_eq!(members[1].username, "beta");
    }

    #[tokio::test]
    async fn start_validates_the_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .respond_with(ResponseTemplate::new(401).set_body_string("401: Unauthorized"))
            .mount(&server)
            .await;

        let capability = test_capability(&server.uri());
        assert!(!capability.is_active());
        assert!(capability.start().await.is_err());
        assert!(!capability.is_active());
    }
}
