// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording adapters for the outbound edges of the pipeline.
//!
//! `RecordingChannel` captures replies handed to the bridge and
//! `RecordingNotifier` captures subscriber alerts, both for assertion in tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use wagent_core::WagentError;
use wagent_core::billing::Notification;
use wagent_core::traits::adapter::PluginAdapter;
use wagent_core::traits::channel::ReplyChannel;
use wagent_core::traits::notification::NotificationSink;
use wagent_core::types::{AdapterType, HealthStatus, ProcessingResult};

/// One reply handed to the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub account_id: i64,
    pub chat_id: String,
    pub result: ProcessingResult,
}

/// A reply channel that remembers every delivery.
#[derive(Default)]
pub struct RecordingChannel {
    delivered: Mutex<Vec<Delivery>>,
    fail: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (after being recorded).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.delivered.lock().await.clone()
    }

    pub async fn delivery_count(&self) -> usize {
        self.delivered.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for RecordingChannel {
    fn name(&self) -> &str {
        "recording-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, WagentError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WagentError> {
        Ok(())
    }
}

#[async_trait]
impl ReplyChannel for RecordingChannel {
    async fn deliver(
        &self,
        account_id: i64,
        chat_id: &str,
        result: &ProcessingResult,
    ) -> Result<(), WagentError> {
        self.delivered.lock().await.push(Delivery {
            account_id,
            chat_id: chat_id.to_string(),
            result: result.clone(),
        });
        if self.fail.load(Ordering::SeqCst) {
            return Err(WagentError::Channel {
                message: "recording channel set to fail".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

/// A notification sink that remembers every alert.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().await.clone()
    }

    /// Notifications of one kind, e.g. `"low_quota"`.
    pub async fn of_kind(&self, kind: &str) -> Vec<Notification> {
        self.seen
            .lock()
            .await
            .iter()
            .filter(|n| n.kind() == kind)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PluginAdapter for RecordingNotifier {
    fn name(&self) -> &str {
        "recording-notifier"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notification
    }

    async fn health_check(&self) -> Result<HealthStatus, WagentError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WagentError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), WagentError> {
        self.seen.lock().await.push(notification.clone());
        Ok(())
    }
}
