// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the webhook gateway.

use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use wagent_config::model::GatewayConfig;
use wagent_core::WagentError;
use wagent_storage::Database;

use crate::auth::{WebhookAuth, signature_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub db: Database,
    pub auth: WebhookAuth,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(db: Database, auth: WebhookAuth) -> Self {
        Self {
            db,
            auth,
            started_at: Instant::now(),
        }
    }
}

/// Routes:
/// - GET /health (public)
/// - POST /webhook/{account_id} (signature checked when a secret is set)
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let webhook_routes = Router::new()
        .route("/webhook/{account_id}", post(handlers::post_webhook))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            signature_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .layer(TraceLayer::new_for_http())
}

/// Bind `host:port` and serve until `cancel` fires.
pub async fn serve(
    config: &GatewayConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), WagentError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WagentError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!(
        %addr,
        signed = state.auth.is_enabled(),
        "webhook gateway listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| WagentError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("webhook gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wagent_core::types::{AiSettings, InboundMessage};
    use wagent_storage::INBOUND_QUEUE;
    use wagent_storage::queries::accounts::{NewAccount, insert_account, insert_subscriber};
    use wagent_storage::queries::queue;

    use crate::auth::SIGNATURE_HEADER;

    const PAYLOAD: &str = r#"{"messageId":"wamid.A1","from":"5511999990000@c.us","body":"oi","timestamp":1760000000,"type":"chat"}"#;

    async fn setup(secret: Option<&str>) -> (GatewayState, i64, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("gw.db").to_str().unwrap())
            .await
            .unwrap();
        let subscriber_id = insert_subscriber(&db, "Loja", None).await.unwrap();
        let account = insert_account(
            &db,
            NewAccount {
                subscriber_id,
                name: "main".into(),
                phone: None,
                ai: AiSettings::default(),
            },
        )
        .await
        .unwrap();
        let state = GatewayState::new(db, WebhookAuth::new(secret.map(String::from)));
        (state, account.id, dir)
    }

    fn webhook(account_id: i64, body: &str, signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/webhook/{account_id}"))
            .header("content-type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header(SIGNATURE_HEADER, sig);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn webhook_queues_message_and_accepts() {
        let (state, account_id, _dir) = setup(None).await;
        let db = state.db.clone();

        let response = router(state)
            .oneshot(webhook(account_id, PAYLOAD, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let entry = queue::dequeue(&db, INBOUND_QUEUE, 30).await.unwrap().unwrap();
        let inbound: InboundMessage = serde_json::from_str(&entry.payload).unwrap();
        assert_eq!(inbound.account_id, account_id);
        assert_eq!(inbound.message_id, "wamid.A1");
        assert_eq!(inbound.body, "oi");
    }

    #[tokio::test]
    async fn own_echo_is_ignored() {
        let (state, account_id, _dir) = setup(None).await;
        let db = state.db.clone();
        let body = PAYLOAD.replace(r#""type":"chat""#, r#""type":"chat","fromMe":true"#);

        let response = router(state)
            .oneshot(webhook(account_id, &body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(queue::backlog(&db, INBOUND_QUEUE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let (state, account_id, _dir) = setup(None).await;
        let response = router(state)
            .oneshot(webhook(account_id + 100, PAYLOAD, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn signature_is_enforced_when_secret_is_set() {
        let (state, account_id, _dir) = setup(Some("s3cret")).await;
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(webhook(account_id, PAYLOAD, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(webhook(account_id, PAYLOAD, Some("sha256=00ff")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let signature = state.auth.sign(PAYLOAD.as_bytes()).unwrap();
        let response = app
            .oneshot(webhook(account_id, PAYLOAD, Some(&signature)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn health_reports_version_and_backlog() {
        let (state, _, _dir) = setup(Some("s3cret")).await;
        queue::enqueue(&state.db, INBOUND_QUEUE, "{}").await.unwrap();

        let response = router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["inbound_backlog"], 1);
    }
}
