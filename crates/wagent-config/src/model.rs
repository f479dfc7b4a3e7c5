// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level wagent configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WagentConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Inbound webhook server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Messaging bridge used for reply delivery.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// AI vendor settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Context window and prompt settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Reply timing defaults.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Usage billing settings.
    #[serde(default)]
    pub billing: BillingConfig,

    /// Subscriber notification delivery.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Queue worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of this deployment.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "wagent".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable SQLite WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("wagent").join("wagent.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("wagent.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Inbound webhook server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Shared secret for `X-Wagent-Signature`. `None` disables verification.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            webhook_secret: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

/// Messaging bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_bridge_timeout")]
    pub timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            api_token: None,
            timeout_secs: default_bridge_timeout(),
        }
    }
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_bridge_timeout() -> u64 {
    15
}

/// AI vendor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Vendor used when an account has no model or names an unknown vendor.
    #[serde(default = "default_vendor")]
    pub default_vendor: String,

    /// Model used when an account has no linked model.
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: Option<f32>,

    /// Upper bound on a single completion call, retries included.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Text sent when the AI is unavailable.
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_vendor: default_vendor(),
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            request_timeout_secs: default_request_timeout(),
            fallback_message: default_fallback_message(),
            anthropic: AnthropicConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

fn default_vendor() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_request_timeout() -> u64 {
    30
}

fn default_fallback_message() -> String {
    "Sorry, I can't answer right now. Someone from our team will get back to you shortly."
        .to_string()
}

/// Anthropic Messages API credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// `None` falls back to the `ANTHROPIC_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_anthropic_url")]
    pub base_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_anthropic_url(),
            api_version: default_api_version(),
        }
    }
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

/// OpenAI-compatible chat completions credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_url(),
        }
    }
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Context window configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Trailing window of history sent to the model.
    #[serde(default = "default_history_window_hours")]
    pub history_window_hours: u32,

    /// Hard cap on history lines, newest kept.
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,

    /// Products listed in the system prompt.
    #[serde(default = "default_catalog_excerpt_limit")]
    pub catalog_excerpt_limit: usize,

    /// Products attached for a SHOW_CATALOG reply.
    #[serde(default = "default_catalog_reply_limit")]
    pub catalog_reply_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_window_hours: default_history_window_hours(),
            max_history_messages: default_max_history_messages(),
            catalog_excerpt_limit: default_catalog_excerpt_limit(),
            catalog_reply_limit: default_catalog_reply_limit(),
        }
    }
}

fn default_history_window_hours() -> u32 {
    24
}

fn default_max_history_messages() -> usize {
    30
}

fn default_catalog_excerpt_limit() -> usize {
    25
}

fn default_catalog_reply_limit() -> usize {
    10
}

/// Reply timing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    #[serde(default = "default_typing_cps")]
    pub typing_chars_per_second: f64,

    /// Relative variance applied to typing duration (0.3 = ±30%).
    #[serde(default = "default_typing_variance")]
    pub typing_variance: f64,

    #[serde(default = "default_min_typing_secs")]
    pub min_typing_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            typing_chars_per_second: default_typing_cps(),
            typing_variance: default_typing_variance(),
            min_typing_secs: default_min_typing_secs(),
        }
    }
}

fn default_typing_cps() -> f64 {
    30.0
}

fn default_typing_variance() -> f64 {
    0.3
}

fn default_min_typing_secs() -> u64 {
    2
}

/// How overage units are priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostScheme {
    /// Distinct price per unit kind (`billing.unit_costs`).
    #[default]
    PerUnitType,
    /// Every unit costs `billing.flat_unit_cost_cents`.
    Flat,
}

/// Usage billing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BillingConfig {
    /// ISO 4217 code of wallet balances.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Remaining-quota percentage at or below which a low-quota alert fires.
    #[serde(default = "default_low_quota_threshold")]
    pub low_quota_threshold_percent: u8,

    /// Units assumed by the pre-check before a reply is generated.
    #[serde(default = "default_estimated_units")]
    pub estimated_units_per_message: u32,

    #[serde(default)]
    pub cost_scheme: CostScheme,

    #[serde(default = "default_flat_unit_cost")]
    pub flat_unit_cost_cents: i64,

    #[serde(default)]
    pub unit_costs: UnitCostConfig,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            low_quota_threshold_percent: default_low_quota_threshold(),
            estimated_units_per_message: default_estimated_units(),
            cost_scheme: CostScheme::default(),
            flat_unit_cost_cents: default_flat_unit_cost(),
            unit_costs: UnitCostConfig::default(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_low_quota_threshold() -> u8 {
    20
}

fn default_estimated_units() -> u32 {
    1
}

fn default_flat_unit_cost() -> i64 {
    5
}

/// Per-kind overage prices in minor currency units.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UnitCostConfig {
    #[serde(default = "default_ai_reply_cost")]
    pub ai_reply_cents: i64,

    #[serde(default = "default_product_cost")]
    pub product_cents: i64,

    #[serde(default = "default_media_cost")]
    pub media_cents: i64,
}

impl Default for UnitCostConfig {
    fn default() -> Self {
        Self {
            ai_reply_cents: default_ai_reply_cost(),
            product_cents: default_product_cost(),
            media_cents: default_media_cost(),
        }
    }
}

fn default_ai_reply_cost() -> i64 {
    5
}

fn default_product_cost() -> i64 {
    3
}

fn default_media_cost() -> i64 {
    2
}

/// Subscriber notification delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    /// Endpoint receiving notification JSON. `None` logs notifications only.
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_notification_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notification_timeout(),
        }
    }
}

fn default_notification_timeout() -> u64 {
    10
}

/// Queue worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Sleep between polls of an empty queue.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Time box for handling one inbound message end to end.
    #[serde(default = "default_processing_timeout")]
    pub processing_timeout_secs: u64,

    /// Inbound messages handled in parallel.
    #[serde(default = "default_inbound_concurrency")]
    pub inbound_concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            processing_timeout_secs: default_processing_timeout(),
            inbound_concurrency: default_inbound_concurrency(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_processing_timeout() -> u64 {
    90
}

fn default_inbound_concurrency() -> usize {
    4
}
