// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply channel trait for delivering results back to the messaging bridge.

use async_trait::async_trait;

use crate::error::WagentError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ProcessingResult;

/// Delivers a processing result to the contact. Timing is applied by the receiver.
#[async_trait]
pub trait ReplyChannel: PluginAdapter {
    async fn deliver(
        &self,
        account_id: i64,
        chat_id: &str,
        result: &ProcessingResult,
    ) -> Result<(), WagentError>;
}
