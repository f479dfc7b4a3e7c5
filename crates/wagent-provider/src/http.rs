// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-over-HTTP transport shared by the vendor adapters.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use wagent_core::WagentError;

use crate::types::ApiErrorResponse;

/// Pooled client that retries transient failures (429, 5xx overload) once.
#[derive(Debug, Clone)]
pub(crate) struct JsonClient {
    client: reqwest::Client,
    vendor: &'static str,
    max_retries: u32,
    retry_delay: Duration,
}

impl JsonClient {
    pub(crate) fn new(
        vendor: &'static str,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<Self, WagentError> {
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| WagentError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            vendor,
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// POST `body` to `url` and decode the JSON response.
    pub(crate) async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, WagentError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(vendor = self.vendor, attempt, "retrying request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|e| WagentError::Provider {
                    message: format!("{} request failed: {e}", self.vendor),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(vendor = self.vendor, status = %status, attempt, "response received");

            if status.is_success() {
                let text = response.text().await.map_err(|e| WagentError::Provider {
                    message: format!("failed to read {} response body: {e}", self.vendor),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&text).map_err(|e| WagentError::Provider {
                    message: format!("failed to parse {} response: {e}", self.vendor),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(vendor = self.vendor, status = %status, body = %body, "transient error, will retry");
                continue;
            }
            return Err(api_error(self.vendor, status, &body));
        }

        Err(WagentError::Provider {
            message: format!("{} request failed after retries", self.vendor),
            source: None,
        })
    }
}

fn api_error(vendor: &str, status: reqwest::StatusCode, body: &str) -> WagentError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(envelope) => format!(
            "{vendor} API error ({}, {status}): {}",
            envelope.error.type_.as_deref().unwrap_or("error"),
            envelope.error.message
        ),
        Err(_) => format!("{vendor} API returned {status}: {body}"),
    };
    WagentError::Provider {
        message,
        source: None,
    }
}

/// Status codes worth one more attempt.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 529)
}
