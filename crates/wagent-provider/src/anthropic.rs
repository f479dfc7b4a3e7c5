// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;
use wagent_config::model::AnthropicConfig;
use wagent_core::types::{CompletionRequest, ProviderResponse, TokenUsage};
use wagent_core::{AdapterType, HealthStatus, PluginAdapter, ProviderAdapter, WagentError};

use crate::http::JsonClient;
use crate::types::{ApiMessage, MessageRequest, MessageResponse};

pub const VENDOR: &str = "anthropic";

pub struct AnthropicAdapter {
    client: JsonClient,
    url: String,
}

impl AnthropicAdapter {
    pub fn new(
        config: &AnthropicConfig,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, WagentError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| WagentError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&config.api_version).map_err(|e| {
                WagentError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        Ok(Self {
            client: JsonClient::new(VENDOR, headers, timeout)?,
            url: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
        })
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.client = self.client.with_retry_delay(delay);
        self
    }

    fn to_message_request(request: &CompletionRequest) -> MessageRequest {
        MessageRequest {
            model: request.model.clone(),
            system: request.system_prompt.clone(),
            messages: vec![ApiMessage::new("user", request.user_content())],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        VENDOR
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, WagentError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WagentError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn vendor(&self) -> &str {
        VENDOR
    }

    async fn complete(&self, request: CompletionRequest) -> Result<ProviderResponse, WagentError> {
        let body = Self::to_message_request(&request);
        let response: MessageResponse = self.client.post(&self.url, &body).await?;
        debug!(id = %response.id, model = %response.model, "anthropic completion received");
        Ok(ProviderResponse {
            text: response.text(),
            id: response.id,
            model: response.model,
            stop_reason: response.stop_reason,
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(base_url: &str) -> AnthropicAdapter {
        let config = AnthropicConfig {
            base_url: base_url.to_string(),
            ..AnthropicConfig::default()
        };
        AnthropicAdapter::new(&config, "test-api-key", Duration::from_secs(5))
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "claude-3-5-haiku-latest".into(),
            system_prompt: "You sell mugs.".into(),
            history: String::new(),
            user_message: "Hello".into(),
            max_tokens: 256,
            temperature: None,
        }
    }

    fn success(id: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "model": "claude-3-5-haiku-latest",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })
    }

    #[tokio::test]
    async fn complete_sends_headers_and_maps_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(serde_json::json!({
                "system": "You sell mugs.",
                "max_tokens": 256,
                "messages": [{"role": "user", "content": "Hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success("msg_1", "Hi there!")))
            .expect(1)
            .mount(&server)
            .await;

        let response = adapter(&server.uri()).complete(request()).await.unwrap();
        assert_eq!(response.id, "msg_1");
        assert_eq!(response.text, "Hi there!");
        assert_eq!(response.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(response.usage.input_tokens, 10);
    }

    #[tokio::test]
    async fn retries_once_on_overload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success("msg_retry", "ok")))
            .mount(&server)
            .await;

        let response = adapter(&server.uri()).complete(request()).await.unwrap();
        assert_eq!(response.id, "msg_retry");
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "Bad model"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter(&server.uri()).complete(request()).await.unwrap_err();
        assert!(err.to_string().contains("invalid_request_error"), "got: {err}");
    }

    #[tokio::test]
    async fn exhausted_retries_surface_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(2)
            .mount(&server)
            .await;

        let err = adapter(&server.uri()).complete(request()).await.unwrap_err();
        assert!(matches!(err, WagentError::Provider { .. }));
    }
}
