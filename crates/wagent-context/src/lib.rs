// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context builder for wagent completions.
//!
//! Produces the two halves of a completion request:
//! - **History**: the trailing conversation window rendered as `[HH:MM] Role: text`
//! - **System prompt**: persona, reply rules, catalog excerpt and marker instructions

pub mod history;
pub mod prompt;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use wagent_config::model::ContextConfig;
use wagent_core::error::WagentError;
use wagent_core::traits::StorageAdapter;
use wagent_core::types::{Account, CompletionRequest, InboundMessage, Message, ModelConfig, Product};

pub use history::render_history;
pub use prompt::{SystemPrompt, format_price};

/// Assembles completion requests from stored history and account settings.
#[derive(Debug, Clone)]
pub struct ContextEngine {
    config: ContextConfig,
}

impl ContextEngine {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Oldest timestamp inside the history window. A zero-hour window is unbounded.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.config.history_window_hours {
            0 => DateTime::<Utc>::UNIX_EPOCH,
            hours => now - Duration::hours(i64::from(hours)),
        }
    }

    /// Maximum messages kept. Zero means no count bound.
    pub fn max_messages(&self) -> usize {
        match self.config.max_history_messages {
            0 => usize::MAX,
            n => n,
        }
    }

    /// Load the conversation window ending at `now`, oldest first.
    pub async fn load_history(
        &self,
        storage: &dyn StorageAdapter,
        conversation_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Message>, WagentError> {
        let messages = storage
            .recent_messages(conversation_id, self.window_start(now), self.max_messages())
            .await?;
        debug!(conversation_id, count = messages.len(), "history window loaded");
        Ok(messages)
    }

    /// Build the request for one inbound message.
    ///
    /// `history` is the window preceding `inbound`; a copy of the inbound message
    /// already present in it (same external id) is not repeated.
    pub fn build_request(
        &self,
        account: &Account,
        inbound: &InboundMessage,
        history: &[Message],
        catalog: &[Product],
        model: &ModelConfig,
        now: DateTime<Utc>,
    ) -> CompletionRequest {
        let prior: Vec<Message> = history
            .iter()
            .filter(|m| m.external_id.as_deref() != Some(inbound.message_id.as_str()))
            .cloned()
            .collect();

        let system_prompt = SystemPrompt::new(&account.name, now)
            .persona(account.ai.system_prompt.as_deref())
            .catalog(catalog)
            .render();

        CompletionRequest {
            model: model.model.clone(),
            system_prompt,
            history: render_history(&prior),
            user_message: inbound.body.trim().to_string(),
            max_tokens: model.max_tokens,
            temperature: model.temperature,
        }
    }
}
