// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook gateway.
//!
//! Handles POST /webhook/{account_id} and GET /health.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use wagent_core::types::{InboundMessage, MessageType};
use wagent_storage::INBOUND_QUEUE;
use wagent_storage::queries::{accounts, queue};

use crate::server::GatewayState;

/// Body of a bridge webhook delivery.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub message_id: String,
    /// Chat id of the sender, e.g. `5511999990000@c.us`.
    pub from: String,
    #[serde(default)]
    pub body: String,
    /// Unix seconds.
    pub timestamp: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub chat_name: Option<String>,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl WebhookPayload {
    /// Map to pipeline input. Fails only on an unrepresentable timestamp.
    pub fn into_inbound(self, account_id: i64) -> Option<InboundMessage> {
        let timestamp = DateTime::<Utc>::from_timestamp(self.timestamp, 0)?;
        Some(InboundMessage {
            message_id: self.message_id,
            account_id,
            sender_id: self.from,
            body: self.body,
            timestamp,
            message_type: message_type(self.kind.as_deref()),
            is_group: self.is_group,
            chat_name: self.chat_name.filter(|n| !n.trim().is_empty()),
            metadata: self.metadata,
        })
    }
}

/// Bridge message types; anything unknown is treated as text.
fn message_type(kind: Option<&str>) -> MessageType {
    match kind.map(str::to_ascii_lowercase).as_deref() {
        Some("image") | Some("sticker") => MessageType::Image,
        Some("document") => MessageType::Document,
        Some("audio") | Some("ptt") | Some("voice") => MessageType::Audio,
        _ => MessageType::Text,
    }
}

/// Response body for POST /webhook/{account_id}.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<i64>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbound_backlog: Option<i64>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// POST /webhook/{account_id}
///
/// Queues the message for the inbound worker and answers immediately.
pub async fn post_webhook(
    State(state): State<GatewayState>,
    Path(account_id): Path<i64>,
    Json(payload): Json<WebhookPayload>,
) -> Response {
    if payload.from_me {
        debug!(account_id, message_id = %payload.message_id, "ignoring own message echo");
        return (
            StatusCode::OK,
            Json(WebhookAck {
                status: "ignored",
                entry_id: None,
            }),
        )
            .into_response();
    }

    match accounts::get_account(&state.db, account_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                format!("unknown account {account_id}"),
            );
        }
        Err(e) => {
            error!(account_id, error = %e, "account lookup failed");
            return error_response(StatusCode::SERVICE_UNAVAILABLE, "storage unavailable");
        }
    }

    let message_id = payload.message_id.clone();
    let Some(inbound) = payload.into_inbound(account_id) else {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "invalid timestamp");
    };

    let encoded = match serde_json::to_string(&inbound) {
        Ok(encoded) => encoded,
        Err(e) => {
            error!(account_id, error = %e, "failed to encode inbound message");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "encoding failed");
        }
    };

    match queue::enqueue(&state.db, INBOUND_QUEUE, &encoded).await {
        Ok(entry_id) => {
            info!(account_id, %message_id, entry_id, "inbound message queued");
            (
                StatusCode::ACCEPTED,
                Json(WebhookAck {
                    status: "queued",
                    entry_id: Some(entry_id),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(account_id, %message_id, error = %e, "failed to queue inbound message");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "queue unavailable")
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let uptime_secs = state.started_at.elapsed().as_secs();
    let version = env!("CARGO_PKG_VERSION").to_string();

    match queue::backlog(&state.db, INBOUND_QUEUE).await {
        Ok(backlog) => Json(HealthResponse {
            status: "ok",
            version,
            uptime_secs,
            inbound_backlog: Some(backlog),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "health check could not reach storage");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    version,
                    uptime_secs,
                    inbound_backlog: None,
                }),
            )
                .into_response()
        }
    }
}
