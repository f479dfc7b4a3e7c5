// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! When a shared secret is configured the bridge signs every request body
//! with HMAC-SHA256 and sends `X-Wagent-Signature: sha256=<hex>`. Requests
//! with a missing or wrong signature are rejected before any handler runs.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-wagent-signature";

/// Largest webhook body accepted for verification.
pub const MAX_WEBHOOK_BYTES: usize = 256 * 1024;

type HmacSha256 = Hmac<Sha256>;

/// Shared-secret configuration for inbound webhooks.
#[derive(Clone, Default)]
pub struct WebhookAuth {
    secret: Option<String>,
}

impl std::fmt::Debug for WebhookAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAuth")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl WebhookAuth {
    /// A blank secret disables verification.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Header value for `body`, as the bridge would compute it.
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_ref()?.as_bytes()).ok()?;
        mac.update(body);
        Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
    }

    /// Constant-time check of a signature header against `body`.
    pub fn verify(&self, header: Option<&str>, body: &[u8]) -> bool {
        let Some(secret) = &self.secret else {
            return true;
        };
        let signature = header.unwrap_or("").trim();
        let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
        if signature.is_empty() {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

/// Middleware that buffers the body, checks its signature and passes it on.
pub async fn signature_middleware(
    State(auth): State<WebhookAuth>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !auth.is_enabled() {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_WEBHOOK_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    let header = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if !auth.verify(header, &bytes) {
        tracing::warn!(path = %parts.uri.path(), "webhook signature rejected");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
