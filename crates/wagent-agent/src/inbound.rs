// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound handler: records a received message, decides whether to answer,
//! runs the orchestrator and delivers the reply.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use wagent_core::types::{
    InboundMessage, NewConversation, NewMessage, ProcessingResult, SkipReason,
};
use wagent_core::{ReplyChannel, StorageAdapter, UsageGate, WagentError};

use crate::orchestrator::MessageOrchestrator;

pub struct InboundHandler {
    storage: Arc<dyn StorageAdapter>,
    gate: Arc<dyn UsageGate>,
    orchestrator: Arc<MessageOrchestrator>,
    channel: Arc<dyn ReplyChannel>,
    estimated_units: u32,
    processing_timeout: Duration,
}

impl InboundHandler {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        gate: Arc<dyn UsageGate>,
        orchestrator: Arc<MessageOrchestrator>,
        channel: Arc<dyn ReplyChannel>,
    ) -> Self {
        Self {
            storage,
            gate,
            orchestrator,
            channel,
            estimated_units: 1,
            processing_timeout: Duration::from_secs(90),
        }
    }

    /// Units assumed by the billing pre-check.
    pub fn with_estimated_units(mut self, units: u32) -> Self {
        self.estimated_units = units;
        self
    }

    /// Upper bound for orchestrating one message.
    pub fn with_processing_timeout(mut self, timeout: Duration) -> Self {
        self.processing_timeout = timeout;
        self
    }

    /// Handle one message from the bridge.
    ///
    /// Returns an error only for storage failures, unknown accounts and timeouts;
    /// skipped messages and failed deliveries still return their result.
    pub async fn handle(&self, inbound: InboundMessage) -> Result<ProcessingResult, WagentError> {
        let account = self
            .storage
            .get_account(inbound.account_id)
            .await?
            .ok_or_else(|| WagentError::not_found("account", inbound.account_id))?;

        let conversation = self
            .storage
            .find_or_create_conversation(
                account.id,
                NewConversation {
                    external_chat_id: inbound.sender_id.clone(),
                    contact_name: inbound.chat_name.clone(),
                    contact_phone: contact_phone(&inbound),
                    is_group: inbound.is_group,
                },
            )
            .await?;

        let history = self
            .orchestrator
            .context()
            .load_history(self.storage.as_ref(), conversation.id, Utc::now())
            .await?;
        let recorded = self
            .storage
            .append_message(NewMessage::inbound(conversation.id, &inbound))
            .await?;
        if recorded.is_none() {
            debug!(
                account_id = account.id,
                message_id = %inbound.message_id,
                "message already handled, not answering again"
            );
            return Ok(ProcessingResult::skipped(SkipReason::Duplicate));
        }

        if let Some(reason) = account.ai.gate(&inbound) {
            debug!(account_id = account.id, %reason, "not answering");
            return Ok(ProcessingResult::skipped(reason));
        }

        if !self
            .gate
            .can_process_message(account.subscriber_id, self.estimated_units)
            .await?
        {
            info!(
                account_id = account.id,
                subscriber_id = account.subscriber_id,
                "quota exhausted and wallet cannot cover a reply, not answering"
            );
            return Ok(ProcessingResult::skipped(SkipReason::QuotaUnavailable));
        }

        let result = tokio::time::timeout(
            self.processing_timeout,
            self.orchestrator.process_message(&account, &inbound, &history),
        )
        .await
        .map_err(|_| WagentError::Timeout {
            duration: self.processing_timeout,
        })?;

        if !result.has_reply {
            return Ok(result);
        }

        self.storage
            .append_message(NewMessage::ai_reply(conversation.id, &result, Utc::now()))
            .await?;

        if let Err(e) = self
            .channel
            .deliver(account.id, &inbound.sender_id, &result)
            .await
        {
            warn!(
                account_id = account.id,
                chat_id = %inbound.sender_id,
                error = %e,
                "reply delivery failed"
            );
        }
        Ok(result)
    }
}

/// Phone number of a direct chat id such as `5511999990000@c.us`.
fn contact_phone(inbound: &InboundMessage) -> Option<String> {
    if inbound.is_group {
        return None;
    }
    let user = inbound.sender_id.split('@').next()?;
    (!user.is_empty() && user.chars().all(|c| c.is_ascii_digit())).then(|| user.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(sender: &str, is_group: bool) -> InboundMessage {
        InboundMessage {
            message_id: "m".into(),
            account_id: 1,
            sender_id: sender.into(),
            body: "oi".into(),
            timestamp: Utc::now(),
            message_type: Default::default(),
            is_group,
            chat_name: None,
            metadata: None,
        }
    }

    #[test]
    fn phone_comes_from_direct_chat_ids() {
        assert_eq!(
            contact_phone(&inbound("5511999990000@c.us", false)).as_deref(),
            Some("5511999990000")
        );
        assert_eq!(contact_phone(&inbound("120363-1@g.us", true)), None);
        assert_eq!(contact_phone(&inbound("status@broadcast", false)), None);
    }
}
