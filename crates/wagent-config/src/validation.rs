// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every violation instead of failing on the first one.

use crate::diagnostic::ConfigError;
use crate::model::{CostScheme, WagentConfig};

const KNOWN_VENDORS: &[&str] = &["anthropic", "openai"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &WagentConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let host = config.gateway.host.trim();
    let host_ok = host.parse::<std::net::IpAddr>().is_ok()
        || (!host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-'));
    if !host_ok {
        errors.push(ConfigError::validation(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if let Some(secret) = &config.gateway.webhook_secret
        && secret.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "gateway.webhook_secret must not be empty when set",
        ));
    }

    for (key, url) in [
        ("bridge.base_url", Some(&config.bridge.base_url)),
        ("provider.anthropic.base_url", Some(&config.provider.anthropic.base_url)),
        ("provider.openai.base_url", Some(&config.provider.openai.base_url)),
        ("notifications.webhook_url", config.notifications.webhook_url.as_ref()),
    ] {
        if let Some(url) = url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            errors.push(ConfigError::validation(format!(
                "{key} must be an http(s) URL, got `{url}`"
            )));
        }
    }

    if !KNOWN_VENDORS.contains(&config.provider.default_vendor.as_str()) {
        errors.push(ConfigError::validation(format!(
            "provider.default_vendor must be one of {}, got `{}`",
            KNOWN_VENDORS.join(", "),
            config.provider.default_vendor
        )));
    }

    if config.provider.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "provider.request_timeout_secs must be at least 1",
        ));
    }

    if config.provider.fallback_message.trim().is_empty() {
        errors.push(ConfigError::validation(
            "provider.fallback_message must not be empty",
        ));
    }

    if config.context.history_window_hours == 0 && config.context.max_history_messages == 0 {
        errors.push(ConfigError::validation(
            "context.history_window_hours and context.max_history_messages cannot both be 0",
        ));
    }

    if config.timing.typing_chars_per_second <= 0.0 {
        errors.push(ConfigError::validation(format!(
            "timing.typing_chars_per_second must be positive, got {}",
            config.timing.typing_chars_per_second
        )));
    }

    if !(0.0..1.0).contains(&config.timing.typing_variance) {
        errors.push(ConfigError::validation(format!(
            "timing.typing_variance must be in [0, 1), got {}",
            config.timing.typing_variance
        )));
    }

    let billing = &config.billing;
    if billing.low_quota_threshold_percent > 100 {
        errors.push(ConfigError::validation(format!(
            "billing.low_quota_threshold_percent must be at most 100, got {}",
            billing.low_quota_threshold_percent
        )));
    }

    if billing.currency.len() != 3 || !billing.currency.chars().all(|c| c.is_ascii_uppercase()) {
        errors.push(ConfigError::validation(format!(
            "billing.currency must be a 3-letter ISO code, got `{}`",
            billing.currency
        )));
    }

    let costs = match billing.cost_scheme {
        CostScheme::Flat => vec![("billing.flat_unit_cost_cents", billing.flat_unit_cost_cents)],
        CostScheme::PerUnitType => vec![
            ("billing.unit_costs.ai_reply_cents", billing.unit_costs.ai_reply_cents),
            ("billing.unit_costs.product_cents", billing.unit_costs.product_cents),
            ("billing.unit_costs.media_cents", billing.unit_costs.media_cents),
        ],
    };
    for (key, value) in costs {
        if value < 0 {
            errors.push(ConfigError::validation(format!(
                "{key} must be non-negative, got {value}"
            )));
        }
    }

    if config.worker.inbound_concurrency == 0 {
        errors.push(ConfigError::validation(
            "worker.inbound_concurrency must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
