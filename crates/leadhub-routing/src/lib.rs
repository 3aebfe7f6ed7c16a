// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message routing and realtime relay.
//!
//! An inbound event moves through a linear pipeline on a single task:
//! received -> resolved (lead identity attached) -> persisted -> relayed.
//! Persisting before relaying on the same task is what guarantees per-lead
//! delivery order; there is no per-message fan-out before the persist.
//!
//! Events that cannot be resolved (webhook test payloads, missing tenant
//! context) terminate as `Rejected`: acknowledged to the sender, never
//! persisted. Surfacing an error instead would make the platform retry the
//! same unprocessable payload indefinitely.

pub mod relay;

use std::sync::Arc;
use std::time::Duration;

use leadhub_core::types::{now_rfc3339, Channel, Direction, Lead, Message};
use leadhub_core::{ChatCapability, CommerceCapability, LeadhubError, RealtimeTransport};
use leadhub_resolver::{extract, IdentityResolver};
use leadhub_storage::database::is_unique_violation;
use leadhub_storage::queries::{leads, messages};
use leadhub_storage::Database;
use tracing::{debug, info, warn};

pub use relay::{Relay, RelayFrame};

/// Room name for a lead's message stream.
pub fn lead_room(lead_id: &str) -> String {
    format!("lead:{lead_id}")
}

/// Room name for everything owned by an app user.
pub fn user_room(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Room name for a whole tenant.
pub fn tenant_room(tenant_id: &str) -> String {
    format!("tenant:{tenant_id}")
}

/// A normalized inbound event from either platform.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub channel: Channel,
    pub tenant_id: Option<String>,
    /// Resolution key for the channel: chat user id or commerce
    /// membership id.
    pub external_key: Option<String>,
    pub external_message_id: Option<String>,
    pub content: String,
    pub display_name: Option<String>,
}

impl InboundEvent {
    /// Build an event from a raw webhook payload using the ordered
    /// extraction paths. Returns `None` when the payload is not even an
    /// event object (scalar, empty array).
    pub fn from_webhook(channel: Channel, payload: &serde_json::Value) -> Option<Self> {
        let event = extract::unwrap_event(payload)?;
        let external_key = match channel {
            Channel::Chat => extract::extract_string(event, extract::USER_ID_PATHS),
            // Commerce resolves on membership id; user id only as a
            // fallback for payloads that nest the membership elsewhere.
            Channel::Commerce => extract::extract_string(event, extract::MEMBERSHIP_ID_PATHS)
                .or_else(|| extract::extract_string(event, extract::USER_ID_PATHS)),
        };
        Some(Self {
            channel,
            tenant_id: extract::extract_string(event, extract::TENANT_ID_PATHS),
            external_key,
            external_message_id: extract::extract_string(event, extract::MESSAGE_ID_PATHS),
            content: extract::extract_string(event, extract::CONTENT_PATHS).unwrap_or_default(),
            display_name: extract::extract_string(event, extract::DISPLAY_NAME_PATHS),
        })
    }
}

/// Terminal state of one routed event.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// Persisted and relayed.
    Relayed(Message),
    /// Already persisted earlier (replayed external id); relayed again
    /// idempotently, not persisted again.
    Duplicate(Message),
    /// Unprocessable; acknowledged to the sender without persistence.
    Rejected { reason: String },
}

/// Routes resolved messages to storage and the realtime relay.
pub struct MessageRouter {
    db: Database,
    resolver: IdentityResolver,
    transport: Arc<dyn RealtimeTransport>,
    chat: Arc<dyn ChatCapability>,
    commerce: Arc<dyn CommerceCapability>,
    send_timeout: Duration,
}

impl MessageRouter {
    pub fn new(
        db: Database,
        resolver: IdentityResolver,
        transport: Arc<dyn RealtimeTransport>,
        chat: Arc<dyn ChatCapability>,
        commerce: Arc<dyn CommerceCapability>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            db,
            resolver,
            transport,
            chat,
            commerce,
            send_timeout,
        }
    }

    /// Route one inbound event end to end.
    pub async fn route(&self, event: InboundEvent) -> Result<RouteOutcome, LeadhubError> {
        let Some(tenant_id) = event.tenant_id.as_deref() else {
            debug!("rejecting event without tenant context");
            return Ok(RouteOutcome::Rejected {
                reason: "no tenant context".to_string(),
            });
        };
        let Some(external_key) = event.external_key.as_deref() else {
            debug!(tenant_id, "rejecting event without resolvable identity");
            return Ok(RouteOutcome::Rejected {
                reason: "no resolvable external identity".to_string(),
            });
        };

        // received -> resolved
        let lead = match self
            .resolver
            .resolve(
                tenant_id,
                event.channel,
                external_key,
                event.display_name.as_deref(),
            )
            .await
        {
            Ok(lead) => lead,
            Err(LeadhubError::Resolution(reason)) => {
                debug!(tenant_id, %reason, "rejecting unresolvable event");
                return Ok(RouteOutcome::Rejected { reason });
            }
            Err(e) => return Err(e),
        };

        // resolved -> persisted, with replay de-duplication per channel.
        if let Some(external_id) = event.external_message_id.as_deref() {
            if let Some(existing) =
                messages::find_by_external_id(&self.db, event.channel, external_id).await?
            {
                debug!(external_id, "replayed message, relaying without persist");
                self.relay(&lead, &existing)?;
                return Ok(RouteOutcome::Duplicate(existing));
            }
        }

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            lead_id: lead.id.clone(),
            tenant_id: lead.tenant_id.clone(),
            owner_id: lead.owner_id.clone(),
            direction: Direction::Inbound,
            channel: event.channel,
            content: event.content.clone(),
            external_id: event.external_message_id.clone(),
            created_at: now_rfc3339(),
        };

        let message = match messages::insert_message(&self.db, &message).await {
            Ok(()) => message,
            Err(err) if is_unique_violation(&err) => {
                // A concurrent delivery of the same external id won the
                // insert; relay its row instead.
                let external_id = event.external_message_id.as_deref().unwrap_or_default();
                match messages::find_by_external_id(&self.db, event.channel, external_id).await? {
                    Some(existing) => {
                        self.relay(&lead, &existing)?;
                        return Ok(RouteOutcome::Duplicate(existing));
                    }
                    None => return Err(err),
                }
            }
            Err(err) => return Err(err),
        };

        // persisted -> relayed, same task, so per-lead order follows
        // persist order.
        self.relay(&lead, &message)?;
        info!(
            tenant_id,
            lead_id = %lead.id,
            message_id = %message.id,
            channel = %message.channel,
            "message routed"
        );
        Ok(RouteOutcome::Relayed(message))
    }

    /// Persist an outbound message, then attempt platform delivery.
    ///
    /// The row is written *before* the send so a failed or timed-out send
    /// can be retried from persisted state instead of re-deriving it. On
    /// success the platform's message id is stamped onto the row.
    pub async fn send_outbound(
        &self,
        tenant_id: &str,
        lead_id: &str,
        content: &str,
    ) -> Result<Message, LeadhubError> {
        let lead = leads::get_lead(&self.db, lead_id)
            .await?
            .filter(|l| l.tenant_id == tenant_id)
            .ok_or_else(|| {
                LeadhubError::Resolution(format!(
                    "no lead '{lead_id}' in tenant '{tenant_id}'"
                ))
            })?;

        let (channel, target) = if let Some(chat_user_id) = lead.chat_user_id.as_deref() {
            (Channel::Chat, chat_user_id.to_string())
        } else if let Some(membership_user) = lead.customer_id.as_deref() {
            (Channel::Commerce, membership_user.to_string())
        } else if let Some(membership_id) = lead.membership_id.as_deref() {
            (Channel::Commerce, membership_id.to_string())
        } else {
            return Err(LeadhubError::Resolution(format!(
                "lead '{}' has no external key to deliver to",
                lead.id
            )));
        };

        let mut message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            lead_id: lead.id.clone(),
            tenant_id: lead.tenant_id.clone(),
            owner_id: lead.owner_id.clone(),
            direction: Direction::Outbound,
            channel,
            content: content.to_string(),
            external_id: None,
            created_at: now_rfc3339(),
        };
        messages::insert_message(&self.db, &message).await?;

        let send = async {
            match channel {
                Channel::Chat => self.chat.send_message(&target, content).await,
                Channel::Commerce => self.commerce.send_message(&target, content).await,
            }
        };
        let external_id = match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                warn!(lead_id = %lead.id, message_id = %message.id, error = %e, "outbound send failed, row kept for retry");
                return Err(e);
            }
            Err(_) => {
                warn!(lead_id = %lead.id, message_id = %message.id, "outbound send timed out, row kept for retry");
                return Err(LeadhubError::Timeout {
                    duration: self.send_timeout,
                });
            }
        };

        messages::set_external_id(&self.db, &message.id, &external_id).await?;
        message.external_id = Some(external_id);
        self.relay(&lead, &message)?;
        Ok(message)
    }

    /// Emit a persisted message to the lead, owner, and tenant rooms.
    fn relay(&self, lead: &Lead, message: &Message) -> Result<(), LeadhubError> {
        let payload = serde_json::to_value(message)
            .map_err(|e| LeadhubError::Internal(format!("message serialization: {e}")))?;
        self.transport.emit(&lead_room(&lead.id), "message", &payload)?;
        self.transport.emit(&user_room(&lead.owner_id), "message", &payload)?;
        self.transport.emit(&tenant_room(&lead.tenant_id), "message", &payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadhub_core::types::LeadStatus;
    use leadhub_storage::queries::leads as lead_queries;
    use leadhub_test_utils::{open_temp_db, seed_tenant, CollectingTransport, MockChat, MockCommerce};
    use serde_json::json;

    struct Fixture {
        router: MessageRouter,
        db: Database,
        transport: Arc<CollectingTransport>,
        chat: Arc<MockChat>,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let (db, dir) = open_temp_db().await;
        seed_tenant(&db, "t1", "u1", "owner-ext").await;
        let transport = Arc::new(CollectingTransport::new());
        let chat = Arc::new(MockChat::new());
        let commerce = Arc::new(MockCommerce::new());
        let router = MessageRouter::new(
            db.clone(),
            IdentityResolver::new(db.clone()),
            transport.clone(),
            chat.clone(),
            commerce,
            Duration::from_secs(2),
        );
        Fixture {
            router,
            db,
            transport,
            chat,
            _dir: dir,
        }
    }

    fn chat_event(tenant: &str, user: &str, msg_id: &str, content: &str) -> InboundEvent {
        InboundEvent {
            channel: Channel::Chat,
            tenant_id: Some(tenant.to_string()),
            external_key: Some(user.to_string()),
            external_message_id: Some(msg_id.to_string()),
            content: content.to_string(),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn first_contact_creates_persists_relays() {
        let f = fixture().await;

        let outcome = f.router.route(chat_event("t1", "u123", "x1", "hi")).await.unwrap();
        let RouteOutcome::Relayed(message) = outcome else {
            panic!("expected Relayed, got {outcome:?}");
        };

        // One new lead with the chat key.
        let leads = lead_queries::list_leads_for_tenant(&f.db, "t1").await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].chat_user_id.as_deref(), Some("u123"));
        assert_eq!(leads[0].status, LeadStatus::New);

        // One inbound message persisted.
        assert_eq!(message.direction, Direction::Inbound);
        assert_eq!(message.content, "hi");

        // Relay to lead, owner, and tenant rooms.
        let rooms = f.transport.rooms_for("message");
        assert_eq!(
            rooms,
            vec![
                lead_room(&leads[0].id),
                user_room("u1"),
                tenant_room("t1"),
            ]
        );

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_context_rejects_without_persisting() {
        let f = fixture().await;

        let mut no_tenant = chat_event("t1", "u123", "x1", "hi");
        no_tenant.tenant_id = None;
        assert!(matches!(
            f.router.route(no_tenant).await.unwrap(),
            RouteOutcome::Rejected { .. }
        ));

        let mut no_user = chat_event("t1", "u123", "x1", "hi");
        no_user.external_key = None;
        assert!(matches!(
            f.router.route(no_user).await.unwrap(),
            RouteOutcome::Rejected { .. }
        ));

        // Unknown tenant surfaces as rejection, not an error.
        assert!(matches!(
            f.router.route(chat_event("t-unknown", "u123", "x1", "hi")).await.unwrap(),
            RouteOutcome::Rejected { .. }
        ));

        assert!(lead_queries::list_leads_for_tenant(&f.db, "t1").await.unwrap().is_empty());
        assert!(f.transport.events().is_empty());

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn replayed_external_id_skips_persist_but_still_relays() {
        let f = fixture().await;

        let first = f.router.route(chat_event("t1", "u123", "x1", "hi")).await.unwrap();
        let RouteOutcome::Relayed(original) = first else { panic!() };

        let second = f.router.route(chat_event("t1", "u123", "x1", "hi")).await.unwrap();
        let RouteOutcome::Duplicate(replayed) = second else {
            panic!("expected Duplicate, got {second:?}");
        };
        assert_eq!(replayed.id, original.id);

        // Still exactly one persisted message, but two relay rounds.
        let lead = &lead_queries::list_leads_for_tenant(&f.db, "t1").await.unwrap()[0];
        let persisted = leadhub_storage::queries::messages::get_messages_for_lead(&f.db, &lead.id)
            .await
            .unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(f.transport.rooms_for("message").len(), 6);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn per_lead_relay_follows_persist_order() {
        let f = fixture().await;

        for i in 0..4 {
            f.router
                .route(chat_event("t1", "u123", &format!("x{i}"), &format!("msg {i}")))
                .await
                .unwrap();
        }

        let contents: Vec<String> = f
            .transport
            .events()
            .into_iter()
            .filter(|(room, _, _)| room.starts_with("lead:"))
            .map(|(_, _, payload)| payload["content"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(contents, vec!["msg 0", "msg 1", "msg 2", "msg 3"]);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn outbound_send_persists_before_delivery() {
        let f = fixture().await;

        let lead_id = f
            .router
            .route(chat_event("t1", "u123", "x1", "hi"))
            .await
            .map(|o| match o {
                RouteOutcome::Relayed(m) => m.lead_id,
                other => panic!("unexpected {other:?}"),
            })
            .unwrap();

        let sent = f
            .router
            .send_outbound("t1", &lead_id, "welcome aboard")
            .await
            .unwrap();
        assert_eq!(sent.direction, Direction::Outbound);
        assert!(sent.external_id.is_some());
        assert_eq!(f.chat.sent(), vec![("u123".to_string(), "welcome aboard".to_string())]);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_outbound_send_keeps_persisted_row() {
        let f = fixture().await;

        let outcome = f.router.route(chat_event("t1", "u123", "x1", "hi")).await.unwrap();
        let RouteOutcome::Relayed(inbound) = outcome else { panic!() };

        f.chat.fail_sends(true);
        let err = f
            .router
            .send_outbound("t1", &inbound.lead_id, "will not arrive")
            .await
            .unwrap_err();
        assert!(matches!(err, LeadhubError::Platform { .. }));

        // The outbound row survived the failure, pending retry.
        let messages = messages::get_messages_for_lead(&f.db, &inbound.lead_id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        let pending = &messages[1];
        assert_eq!(pending.direction, Direction::Outbound);
        assert!(pending.external_id.is_none());

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn webhook_payload_normalization() {
        let payload = json!([{
            "type": "message",
            "company_id": "t1",
            "data": {"user": {"id": "u55"}, "content": "from array"},
            "message_id": "wm-1"
        }]);
        let event = InboundEvent::from_webhook(Channel::Commerce, &payload).unwrap();
        assert_eq!(event.tenant_id.as_deref(), Some("t1"));
        assert_eq!(event.external_key.as_deref(), Some("u55"));
        assert_eq!(event.external_message_id.as_deref(), Some("wm-1"));
        assert_eq!(event.content, "from array");

        assert!(InboundEvent::from_webhook(Channel::Chat, &json!("ping")).is_none());
    }
}
