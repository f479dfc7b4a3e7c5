// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI completion gateway for the wagent pipeline.
//!
//! [`CompletionGateway`] routes a request to the vendor adapter the account is
//! linked to, bounds it with a timeout, prices the usage, and turns every
//! failure into a marked fallback completion. Callers never see a vendor error.

mod http;

pub mod anthropic;
pub mod openai;
pub mod pricing;
pub mod types;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use wagent_config::model::ProviderConfig;
use wagent_core::error::WagentError;
use wagent_core::traits::ProviderAdapter;
use wagent_core::types::{Completion, CompletionRequest, CompletionSource, ModelConfig, TokenUsage};

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiAdapter;
pub use pricing::{calculate_cost, get_pricing};

/// Model identifier reported on fallback completions.
pub const FALLBACK_MODEL: &str = "fallback";

/// Vendor-agnostic completion entry point.
pub struct CompletionGateway {
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    defaults: ModelConfig,
    timeout: Duration,
    fallback_text: String,
}

impl CompletionGateway {
    /// Gateway with no adapters registered; every call falls back until one is added.
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            providers: HashMap::new(),
            defaults: ModelConfig {
                vendor: config.default_vendor.clone(),
                model: config.default_model.clone(),
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
            timeout: Duration::from_secs(config.request_timeout_secs),
            fallback_text: config.fallback_message.clone(),
        }
    }

    /// Gateway with an adapter for every vendor that has an API key.
    ///
    /// Keys come from the config, else from `ANTHROPIC_API_KEY` / `OPENAI_API_KEY`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, WagentError> {
        let mut gateway = Self::new(config);
        let timeout = gateway.timeout;

        if let Some(key) = resolve_api_key(&config.anthropic.api_key, "ANTHROPIC_API_KEY") {
            gateway.register(Arc::new(AnthropicAdapter::new(&config.anthropic, &key, timeout)?));
        }
        if let Some(key) = resolve_api_key(&config.openai.api_key, "OPENAI_API_KEY") {
            gateway.register(Arc::new(OpenAiAdapter::new(&config.openai, &key, timeout)?));
        }

        if gateway.providers.is_empty() {
            warn!("no AI vendor has an API key; every reply will be the fallback message");
        } else if !gateway.providers.contains_key(&config.default_vendor) {
            warn!(vendor = %config.default_vendor, "default vendor has no API key");
        }
        Ok(gateway)
    }

    pub fn register(&mut self, provider: Arc<dyn ProviderAdapter>) {
        info!(vendor = provider.vendor(), "provider registered");
        self.providers.insert(provider.vendor().to_string(), provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.register(provider);
        self
    }

    pub fn vendors(&self) -> Vec<&str> {
        let mut vendors: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        vendors.sort_unstable();
        vendors
    }

    /// The account's linked model, or the configured default.
    pub fn resolve_model(&self, linked: Option<&ModelConfig>) -> ModelConfig {
        linked.cloned().unwrap_or_else(|| self.defaults.clone())
    }

    /// Run `request` against `vendor`, or the default vendor if `vendor` is unknown.
    pub async fn complete(&self, vendor: &str, request: CompletionRequest) -> Completion {
        let Some(provider) = self
            .providers
            .get(vendor)
            .or_else(|| self.providers.get(&self.defaults.vendor))
        else {
            warn!(vendor, "no provider available");
            return self.fallback("no provider available");
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, provider.complete(request)).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(vendor = provider.vendor(), error = %e, "completion failed, using fallback");
                return self.fallback(&e.to_string());
            }
            Err(_) => {
                let e = WagentError::Timeout {
                    duration: self.timeout,
                };
                warn!(vendor = provider.vendor(), error = %e, "completion timed out, using fallback");
                return self.fallback(&e.to_string());
            }
        };

        let cost_usd = calculate_cost(&response.usage, &get_pricing(&response.model));
        debug!(
            vendor = provider.vendor(),
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            cost_usd,
            latency_ms,
            "completion received"
        );

        let mut metadata = BTreeMap::new();
        metadata.insert("generated_at".to_string(), json!(Utc::now().to_rfc3339()));
        metadata.insert("vendor".to_string(), json!(provider.vendor()));
        metadata.insert("response_id".to_string(), json!(response.id));
        metadata.insert("latency_ms".to_string(), json!(latency_ms));
        if let Some(stop_reason) = &response.stop_reason {
            metadata.insert("stop_reason".to_string(), json!(stop_reason));
        }

        Completion {
            text: response.text,
            model: response.model,
            confidence: None,
            usage: response.usage,
            cost_usd,
            source: CompletionSource::Model,
            metadata,
        }
    }

    /// The apology completion: zero confidence, no usage, no cost.
    pub fn fallback(&self, reason: &str) -> Completion {
        let mut metadata = BTreeMap::new();
        metadata.insert("generated_at".to_string(), json!(Utc::now().to_rfc3339()));
        metadata.insert("fallback_reason".to_string(), json!(reason));
        Completion {
            text: self.fallback_text.clone(),
            model: FALLBACK_MODEL.to_string(),
            confidence: Some(0.0),
            usage: TokenUsage::default(),
            cost_usd: 0.0,
            source: CompletionSource::Fallback,
            metadata,
        }
    }
}

/// Config value if non-empty, else the environment variable.
fn resolve_api_key(config_key: &Option<String>, env_var: &str) -> Option<String> {
    config_key
        .as_ref()
        .filter(|k| !k.is_empty())
        .cloned()
        .or_else(|| std::env::var(env_var).ok().filter(|k| !k.is_empty()))
}
