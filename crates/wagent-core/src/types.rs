// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the messaging pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::marker::Intent;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
    Notification,
}

// --- Accounts ---

/// Connectivity of the messaging session behind an account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Connected,
    Connecting,
    Disconnected,
}

/// How long to wait before a reply is shown to the contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReplyTiming {
    /// Always wait exactly this many seconds.
    Fixed { seconds: u64 },
    /// Sample uniformly from `[min_seconds, max_seconds]`.
    Random { min_seconds: u64, max_seconds: u64 },
}

impl Default for ReplyTiming {
    fn default() -> Self {
        Self::Random {
            min_seconds: 30,
            max_seconds: 180,
        }
    }
}

/// Reference to the AI model an account replies with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Vendor key, e.g. `anthropic` or `openai`.
    pub vendor: String,
    /// Vendor model identifier.
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_max_tokens() -> u32 {
    1024
}

/// AI persona configuration owned by an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub enabled: bool,
    /// Persona text prepended to the generated system prompt.
    pub system_prompt: Option<String>,
    /// When non-empty, at least one must appear in the inbound body.
    pub trigger_words: Vec<String>,
    /// Any match suppresses the AI reply.
    pub ignore_words: Vec<String>,
    pub reply_to_groups: bool,
    pub timing: ReplyTiming,
    /// Linked model. `None` uses the configured default.
    pub model: Option<ModelConfig>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            system_prompt: None,
            trigger_words: Vec::new(),
            ignore_words: Vec::new(),
            reply_to_groups: false,
            timing: ReplyTiming::default(),
            model: None,
        }
    }
}

/// Why an inbound message did not get an AI reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AiDisabled,
    GroupChat,
    IgnoredWord,
    NoTriggerWord,
    EmptyBody,
    QuotaUnavailable,
    /// The bridge message id was already handled.
    Duplicate,
}

impl AiSettings {
    /// Decide whether an inbound message should be answered.
    ///
    /// Returns the first reason to stay silent, or `None` to reply.
    pub fn gate(&self, inbound: &InboundMessage) -> Option<SkipReason> {
        if !self.enabled {
            return Some(SkipReason::AiDisabled);
        }
        if inbound.is_group && !self.reply_to_groups {
            return Some(SkipReason::GroupChat);
        }
        let body = inbound.body.trim().to_lowercase();
        if body.is_empty() {
            return Some(SkipReason::EmptyBody);
        }
        if contains_any(&body, &self.ignore_words) {
            return Some(SkipReason::IgnoredWord);
        }
        if !self.trigger_words.is_empty() && !contains_any(&body, &self.trigger_words) {
            return Some(SkipReason::NoTriggerWord);
        }
        None
    }
}

fn contains_any(haystack: &str, words: &[String]) -> bool {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .any(|w| haystack.contains(&w))
}

/// One connected messaging session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    /// Owning subscriber (billing identity).
    pub subscriber_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub status: AccountStatus,
    pub ai: AiSettings,
    pub created_at: DateTime<Utc>,
}

// --- Conversations and messages ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Document,
    Audio,
}

/// Speaker label used when rendering history for the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HistoryRole {
    Client,
    Assistant,
    Agent,
}

/// One chat with one external contact (or group) on one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub account_id: i64,
    pub external_chat_id: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub is_group: bool,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Attributes used when a conversation is created lazily.
#[derive(Debug, Clone, Default)]
pub struct NewConversation {
    pub external_chat_id: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub is_group: bool,
}

/// An entry of the append-only message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    /// Bridge-assigned id, when known.
    pub external_id: Option<String>,
    pub direction: Direction,
    pub content: String,
    pub message_type: MessageType,
    pub ai_generated: bool,
    pub model: Option<String>,
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn role(&self) -> HistoryRole {
        match (self.direction, self.ai_generated) {
            (Direction::Inbound, _) => HistoryRole::Client,
            (Direction::Outbound, true) => HistoryRole::Assistant,
            (Direction::Outbound, false) => HistoryRole::Agent,
        }
    }
}

/// A message about to be appended to a conversation.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: i64,
    pub external_id: Option<String>,
    pub direction: Direction,
    pub content: String,
    pub message_type: MessageType,
    pub ai_generated: bool,
    pub model: Option<String>,
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    /// Log entry for a message received from the contact.
    pub fn inbound(conversation_id: i64, inbound: &InboundMessage) -> Self {
        Self {
            conversation_id,
            external_id: Some(inbound.message_id.clone()),
            direction: Direction::Inbound,
            content: inbound.body.clone(),
            message_type: inbound.message_type,
            ai_generated: false,
            model: None,
            confidence: None,
            created_at: inbound.timestamp,
        }
    }

    /// Log entry for an AI-written reply.
    pub fn ai_reply(conversation_id: i64, result: &ProcessingResult, at: DateTime<Utc>) -> Self {
        Self {
            conversation_id,
            external_id: None,
            direction: Direction::Outbound,
            content: result.reply_text.clone(),
            message_type: MessageType::Text,
            ai_generated: true,
            model: result.model.clone(),
            confidence: result.confidence,
            created_at: at,
        }
    }
}

/// A message received from the messaging bridge, already mapped to pipeline input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Bridge message id; the idempotency key for billing.
    pub message_id: String,
    pub account_id: i64,
    /// External chat id of the sender (or the group).
    pub sender_id: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub message_type: MessageType,
    pub is_group: bool,
    pub chat_name: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

// --- Catalog ---

/// A catalog entry owned by a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub subscriber_id: i64,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub media: Vec<String>,
    pub active: bool,
}

/// Product shape attached to a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub media: Vec<String>,
}

impl From<Product> for ProductData {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            price_cents: p.price_cents,
            media: p.media,
        }
    }
}

// --- Completion types ---

/// Token usage reported by a vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Vendor-agnostic completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    /// Rendered history window, may be empty.
    pub history: String,
    pub user_message: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// The single user turn sent to vendors: history block followed by the new message.
    pub fn user_content(&self) -> String {
        if self.history.trim().is_empty() {
            self.user_message.clone()
        } else {
            format!(
                "Conversation so far:\n{}\n\nNew message from the client:\n{}",
                self.history.trim_end(),
                self.user_message
            )
        }
    }
}

/// Raw vendor response, before pricing and fallback handling.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub id: String,
    pub text: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompletionSource {
    Model,
    Fallback,
}

/// What the AI Completion Gateway hands back. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub confidence: Option<f32>,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub source: CompletionSource,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Completion {
    pub fn is_fallback(&self) -> bool {
        self.source == CompletionSource::Fallback
    }
}

/// Parser output: display text plus requested action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub message: String,
    pub intent: Intent,
    pub product_ids: Vec<i64>,
}

impl ParsedResponse {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            intent: Intent::Text,
            product_ids: Vec::new(),
        }
    }
}

/// The single result contract of the orchestrator, read by delivery and billing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub processed: bool,
    pub has_reply: bool,
    pub reply_text: String,
    pub products: Vec<ProductData>,
    pub wait_time_seconds: u64,
    pub typing_duration_seconds: u64,
    pub intent: Intent,
    pub model: Option<String>,
    pub confidence: Option<f32>,
    /// True when the reply is the gateway's apology text.
    pub fallback: bool,
    pub skip_reason: Option<SkipReason>,
}

impl ProcessingResult {
    /// The message was not handled by the AI at all.
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            processed: false,
            skip_reason: Some(reason),
            ..Self::without_reply()
        }
    }

    /// Handled, but nothing is sent back.
    pub fn without_reply() -> Self {
        Self {
            processed: true,
            has_reply: false,
            reply_text: String::new(),
            products: Vec::new(),
            wait_time_seconds: 0,
            typing_duration_seconds: 0,
            intent: Intent::Text,
            model: None,
            confidence: None,
            fallback: false,
            skip_reason: None,
        }
    }
}
