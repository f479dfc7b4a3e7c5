// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat completions adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;
use wagent_config::model::OpenAiConfig;
use wagent_core::types::{CompletionRequest, ProviderResponse, TokenUsage};
use wagent_core::{AdapterType, HealthStatus, PluginAdapter, ProviderAdapter, WagentError};

use crate::http::JsonClient;
use crate::types::{ApiMessage, ChatRequest, ChatResponse};

pub const VENDOR: &str = "openai";

pub struct OpenAiAdapter {
    client: JsonClient,
    url: String,
}

impl OpenAiAdapter {
    pub fn new(config: &OpenAiConfig, api_key: &str, timeout: Duration) -> Result<Self, WagentError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| WagentError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            client: JsonClient::new(VENDOR, headers, timeout)?,
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.client = self.client.with_retry_delay(delay);
        self
    }

    fn to_chat_request(request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.clone(),
            messages: vec![
                ApiMessage::new("system", request.system_prompt.clone()),
                ApiMessage::new("user", request.user_content()),
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiAdapter {
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
impl ProviderAdapter for OpenAiAdapter {
    fn vendor(&self) -> &str {
        VENDOR
    }

    async fn complete(&self, request: CompletionRequest) -> Result<ProviderResponse, WagentError> {
        let body = Self::to_chat_request(&request);
        let response: ChatResponse = self.client.post(&self.url, &body).await?;
        debug!(id = %response.id, model = %response.model, "openai completion received");

        let usage = response.usage.unwrap_or_default();
        let choice = response.choices.into_iter().next();
        let (text, stop_reason) = match choice {
            Some(choice) => (choice.message.content.unwrap_or_default(), choice.finish_reason),
            None => (String::new(), None),
        };

        Ok(ProviderResponse {
            id: response.id,
            text,
            model: response.model,
            stop_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }
}
