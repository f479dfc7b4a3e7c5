// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::billing::Notification;
use crate::error::WagentError;
use crate::traits::adapter::PluginAdapter;

/// External notification service (email, push). Transport is the implementor's concern.
#[async_trait]
pub trait NotificationSink: PluginAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), WagentError>;
}
