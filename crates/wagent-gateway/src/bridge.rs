// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply delivery to the messaging bridge.
//!
//! The bridge owns the WhatsApp session; it waits `waitTimeSeconds`, shows
//! typing for `typingDurationSeconds` and then sends the text and products.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use wagent_config::model::BridgeConfig;
use wagent_core::types::{AdapterType, HealthStatus, ProcessingResult};
use wagent_core::{PluginAdapter, ReplyChannel, WagentError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BridgeReply<'a> {
    chat_id: &'a str,
    #[serde(flatten)]
    result: &'a ProcessingResult,
}

/// [`ReplyChannel`] posting results to `{base_url}/accounts/{id}/messages`.
#[derive(Clone)]
pub struct BridgeChannel {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl std::fmt::Debug for BridgeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeChannel")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl BridgeChannel {
    pub fn new(config: &BridgeConfig) -> Result<Self, WagentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WagentError::Channel {
                message: format!("failed to build bridge client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn messages_url(&self, account_id: i64) -> String {
        format!("{}/accounts/{account_id}/messages", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl PluginAdapter for BridgeChannel {
    fn name(&self) -> &str {
        "bridge"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, WagentError> {
        let request = self.authorize(self.client.get(format!("{}/health", self.base_url)));
        match request.send().await {
            Ok(response) if response.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(response) => Ok(HealthStatus::Degraded(format!(
                "bridge health returned {}",
                response.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("bridge unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), WagentError> {
        Ok(())
    }
}

#[async_trait]
impl ReplyChannel for BridgeChannel {
    async fn deliver(
        &self,
        account_id: i64,
        chat_id: &str,
        result: &ProcessingResult,
    ) -> Result<(), WagentError> {
        let response = self
            .authorize(self.client.post(self.messages_url(account_id)))
            .json(&BridgeReply { chat_id, result })
            .send()
            .await
            .map_err(|e| WagentError::Channel {
                message: format!("bridge unreachable: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WagentError::Channel {
                message: format!("bridge rejected reply with {status}"),
                source: None,
            });
        }
        debug!(account_id, chat_id, products = result.products.len(), "reply handed to bridge");
        Ok(())
    }
}
