// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for webhook ingress and health.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use leadhub_core::types::Channel;
use leadhub_routing::{InboundEvent, RouteOutcome};
use serde::Serialize;
use tracing::{error, info};

use crate::server::GatewayState;

/// Response body for webhook acknowledgements.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    /// "ok" when routed, "duplicate" when replayed, "ignored" when rejected.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /webhooks/chat
pub async fn post_chat_webhook(
    State(state): State<GatewayState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    handle_webhook(state, Channel::Chat, payload).await
}

/// POST /webhooks/commerce
pub async fn post_commerce_webhook(
    State(state): State<GatewayState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    handle_webhook(state, Channel::Commerce, payload).await
}

async fn handle_webhook(
    state: GatewayState,
    channel: Channel,
    payload: serde_json::Value,
) -> Response {
    let Some(event) = InboundEvent::from_webhook(channel, &payload) else {
        // Not even an event object. Ack so the sender stops redelivering.
        info!(%channel, "ignoring non-event webhook payload");
        return ack_ignored("payload is not an event object");
    };

    match state.router.route(event).await {
        Ok(RouteOutcome::Relayed(message)) => Json(AckResponse {
            status: "ok",
            message_id: Some(message.id),
            reason: None,
        })
        .into_response(),
        Ok(RouteOutcome::Duplicate(message)) => Json(AckResponse {
            status: "duplicate",
            message_id: Some(message.id),
            reason: None,
        })
        .into_response(),
        Ok(RouteOutcome::Rejected { reason }) => {
            info!(%channel, %reason, "webhook acknowledged without processing");
            ack_ignored(&reason)
        }
        Err(e) => {
            // Storage or platform failure; a retry from the sender can
            // legitimately succeed later.
            error!(%channel, error = %e, "webhook processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AckResponse {
                    status: "error",
                    message_id: None,
                    reason: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

fn ack_ignored(reason: &str) -> Response {
    Json(AckResponse {
        status: "ignored",
        message_id: None,
        reason: Some(reason.to_string()),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use leadhub_resolver::IdentityResolver;
    use leadhub_routing::MessageRouter;
    use leadhub_storage::queries::leads;
    use leadhub_storage::Database;
    use leadhub_test_utils::{open_temp_db, seed_tenant, MockChat, MockCommerce};
    use tower::ServiceExt;

    use crate::server::build_router;

    async fn test_app() -> (axum::Router, Database, tempfile::TempDir) {
        let (db, dir) = open_temp_db().await;
        seed_tenant(&db, "t1", "u1", "owner-ext").await;
        let relay = Arc::new(leadhub_routing::Relay::new());
        let router = MessageRouter::new(
            db.clone(),
            IdentityResolver::new(db.clone()),
            relay.clone(),
            Arc::new(MockChat::new()),
            Arc::new(MockCommerce::new()),
            Duration::from_secs(2),
        );
        let state = GatewayState {
            router: Arc::new(router),
            relay,
            start_time: std::time::Instant::now(),
        };
        (build_router(state), db, dir)
    }

    async fn post_json(app: &axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn chat_webhook_routes_and_acks() {
        let (app, db, _dir) = test_app().await;

        let (status, body) = post_json(
            &app,
            "/webhooks/chat",
            serde_json::json!({
                "tenant_id": "t1",
                "author": {"id": "u42", "username": "dee"},
                "message_id": "x1",
                "content": "hi there"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["message_id"].is_string());

        let all = leads::list_leads_for_tenant(&db, "t1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].chat_user_id.as_deref(), Some("u42"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unresolvable_webhook_is_acked_not_errored() {
        let (app, db, _dir) = test_app().await;

        // A ping-style payload with no identity at all.
        let (status, body) = post_json(
            &app,
            "/webhooks/commerce",
            serde_json::json!({"type": "ping"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ignored");

        // An array-wrapped scalar is not an event.
        let (status, body) = post_json(&app, "/webhooks/chat", serde_json::json!([])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ignored");

        assert!(leads::list_leads_for_tenant(&db, "t1").await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn replayed_webhook_acks_duplicate() {
        let (app, db, _dir) = test_app().await;
        let payload = serde_json::json!({
            "tenant_id": "t1",
            "user_id": "u42",
            "message_id": "x1",
            "content": "hi"
        });

        let (_, first) = post_json(&app, "/webhooks/chat", payload.clone()).await;
        let (status, second) = post_json(&app, "/webhooks/chat", payload).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["status"], "duplicate");
        assert_eq!(second["message_id"], first["message_id"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (app, db, _dir) = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert!(body["version"].is_string());

        db.close().await.unwrap();
    }
}
