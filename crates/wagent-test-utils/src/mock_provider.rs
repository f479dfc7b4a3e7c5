// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock AI vendor for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with scripted completions,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use wagent_core::WagentError;
use wagent_core::traits::adapter::PluginAdapter;
use wagent_core::traits::provider::ProviderAdapter;
use wagent_core::types::{
    AdapterType, CompletionRequest, HealthStatus, ProviderResponse, TokenUsage,
};

/// Text returned once the script runs out.
pub const DEFAULT_REPLY: &str = "Olá! Como posso ajudar?";

/// A scripted vendor. Completions are popped from a FIFO queue; `Err`
/// entries simulate vendor outages.
pub struct MockProvider {
    vendor: String,
    script: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    /// A mock registered under the `openai` vendor key.
    pub fn new() -> Self {
        Self::for_vendor("openai")
    }

    pub fn for_vendor(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock pre-loaded with successful completions.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::new()
        }
    }

    pub async fn push_response(&self, text: impl Into<String>) {
        self.script.lock().await.push_back(Ok(text.into()));
    }

    /// The next call fails with a provider error.
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.script.lock().await.push_back(Err(message.into()));
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
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
impl ProviderAdapter for MockProvider {
    fn vendor(&self) -> &str {
        &self.vendor
    }

    async fn complete(&self, request: CompletionRequest) -> Result<ProviderResponse, WagentError> {
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        let next = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(DEFAULT_REPLY.to_string()));

        match next {
            Ok(text) => Ok(ProviderResponse {
                id: format!("mock-resp-{}", uuid::Uuid::new_v4()),
                text,
                model,
                stop_reason: Some("stop".to_string()),
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 20,
                },
            }),
            Err(message) => Err(WagentError::Provider {
                message,
                source: None,
            }),
        }
    }
}
