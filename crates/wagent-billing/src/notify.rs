// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sinks for subscriber alerts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use wagent_config::model::NotificationConfig;
use wagent_core::billing::Notification;
use wagent_core::{AdapterType, HealthStatus, NotificationSink, PluginAdapter, WagentError};

/// Writes notifications to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl PluginAdapter for TracingNotifier {
    fn name(&self) -> &str {
        "log"
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
impl NotificationSink for TracingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), WagentError> {
        info!(
            kind = notification.kind(),
            subscriber_id = notification.subscriber_id(),
            ?notification,
            "subscriber notification"
        );
        Ok(())
    }
}

/// POSTs each notification as JSON to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WagentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WagentError::Channel {
                message: format!("failed to build notification client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
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
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), WagentError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| WagentError::Channel {
                message: format!("notification webhook unreachable: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, kind = notification.kind(), "notification webhook rejected");
            return Err(WagentError::Channel {
                message: format!("notification webhook returned {status}"),
                source: None,
            });
        }
        Ok(())
    }
}

/// Webhook sink when a URL is configured, log sink otherwise.
pub fn notifier_from_config(
    config: &NotificationConfig,
) -> Result<Arc<dyn NotificationSink>, WagentError> {
    match config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(
            url,
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(TracingNotifier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn low_quota() -> Notification {
        Notification::LowQuota {
            subscriber_id: 7,
            remaining_messages: 15,
            threshold_percent: 20,
        }
    }

    #[tokio::test]
    async fn webhook_posts_tagged_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "kind": "low_quota",
                "subscriber_id": 7,
                "remaining_messages": 15,
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            WebhookNotifier::new(format!("{}/hook", server.uri()), Duration::from_secs(5)).unwrap();
        notifier.notify(&low_quota()).await.unwrap();
    }

    #[tokio::test]
    async fn webhook_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = notifier.notify(&low_quota()).await.unwrap_err();
        assert!(err.to_string().contains("500"), "got {err}");
    }

    #[tokio::test]
    async fn config_without_url_logs_only() {
        let sink = notifier_from_config(&NotificationConfig::default()).unwrap();
        assert_eq!(sink.name(), "log");
        sink.notify(&low_quota()).await.unwrap();

        let sink = notifier_from_config(&NotificationConfig {
            webhook_url: Some("http://127.0.0.1:9/hook".into()),
            timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(sink.name(), "webhook");
    }
}
