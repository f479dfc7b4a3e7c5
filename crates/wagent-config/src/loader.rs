// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./wagent.toml` > `~/.config/wagent/wagent.toml` > `/etc/wagent/wagent.toml`
//! with environment variable overrides via `WAGENT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WagentConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wagent/wagent.toml` (system-wide)
/// 3. `~/.config/wagent/wagent.toml` (user XDG config)
/// 4. `./wagent.toml` (local directory)
/// 5. `WAGENT_*` environment variables
pub fn load_config() -> Result<WagentConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and loading an explicit config file.
pub fn load_config_from_str(toml_content: &str) -> Result<WagentConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WagentConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WagentConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WagentConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WagentConfig::default()))
        .merge(Toml::file("/etc/wagent/wagent.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("wagent/wagent.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("wagent.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `WAGENT_BILLING_LOW_QUOTA_THRESHOLD_PERCENT` must map to
/// `billing.low_quota_threshold_percent`. Nested tables are mapped first.
fn env_provider() -> Env {
    Env::prefixed("WAGENT_").map(|key| map_env_key(key.as_str()).into())
}

/// Figment hands over the key in its original case; sections match lowercase.
pub(crate) fn map_env_key(key: &str) -> String {
    const NESTED: &[(&str, &str)] = &[
        ("provider_anthropic_", "provider.anthropic."),
        ("provider_openai_", "provider.openai."),
        ("billing_unit_costs_", "billing.unit_costs."),
    ];
    const SECTIONS: &[&str] = &[
        "agent",
        "storage",
        "gateway",
        "bridge",
        "provider",
        "context",
        "timing",
        "billing",
        "notifications",
        "worker",
    ];
    let key = key.to_ascii_lowercase();

    for (prefix, dotted) in NESTED {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{dotted}{rest}");
        }
    }
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}
