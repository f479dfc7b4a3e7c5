// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for AI vendor integrations.

use async_trait::async_trait;

use crate::error::WagentError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionRequest, ProviderResponse};

/// A single AI vendor behind the "generate completion" capability.
///
/// Vendors differ in authentication and request shape only. Errors are
/// returned as-is; the completion gateway turns them into fallbacks.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Vendor key matched against `ModelConfig::vendor`.
    fn vendor(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<ProviderResponse, WagentError>;
}
