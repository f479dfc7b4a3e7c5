// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription, usage, wallet, and notification types shared by billing and storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{InboundMessage, ProcessingResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
    Pending,
}

/// A time-bounded package grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub subscriber_id: i64,
    pub package_name: String,
    pub messages_limit: i64,
    pub products_limit: Option<i64>,
    pub accounts_limit: Option<i64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: SubscriptionStatus,
}

impl Subscription {
    /// Inside its validity window and neither cancelled nor pending.
    ///
    /// `Expired` only records that the window has closed, so an expired grant
    /// still governs instants inside its window.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Expired
        ) && self.starts_at <= now
            && now < self.ends_at
    }
}

/// Usage of one account within one subscription cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub subscription_id: i64,
    pub account_id: i64,
    pub messages_used: i64,
    pub overage_messages_used: i64,
    pub overage_cost_paid_cents: i64,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_overage_payment_at: Option<DateTime<Utc>>,
}

/// Prepaid balance of a subscriber, in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub subscriber_id: i64,
    pub balance_cents: i64,
    pub currency: String,
}

impl Wallet {
    pub fn can_afford(&self, cost_cents: i64) -> bool {
        self.balance_cents >= cost_cents
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    /// Sign applied to the amount when moving the balance.
    pub fn sign(self) -> i64 {
        match self {
            TransactionKind::Credit => 1,
            TransactionKind::Debit => -1,
        }
    }
}

/// Wallet ledger entry. The only path by which balances change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: String,
    pub subscriber_id: i64,
    pub kind: TransactionKind,
    /// Always positive; direction comes from `kind`.
    pub amount_cents: i64,
    pub balance_after_cents: i64,
    pub reference: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn signed_amount(&self) -> i64 {
        self.kind.sign() * self.amount_cents
    }
}

/// Category of a billable message unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    AiReply,
    Product,
    Media,
}

/// Unit counts of one processed message, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillableUnits {
    pub ai_replies: u32,
    pub products: u32,
    pub media: u32,
}

impl BillableUnits {
    /// Units of a processing result: the AI text, each product, each media item.
    ///
    /// Skipped messages, empty replies and fallback apologies carry no AI unit.
    pub fn from_result(result: &ProcessingResult) -> Self {
        let ai_replies = u32::from(result.processed && result.has_reply && !result.fallback);
        let products = result.products.len() as u32;
        let media = result.products.iter().map(|p| p.media.len() as u32).sum();
        Self {
            ai_replies,
            products,
            media,
        }
    }

    pub fn total(&self) -> u32 {
        self.ai_replies + self.products + self.media
    }

    pub fn count(&self, kind: UnitKind) -> u32 {
        match kind {
            UnitKind::AiReply => self.ai_replies,
            UnitKind::Product => self.products,
            UnitKind::Media => self.media,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Emitted by the orchestrator once per processed inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageProcessed {
    pub event_id: String,
    pub account_id: i64,
    pub subscriber_id: i64,
    pub inbound: InboundMessage,
    pub result: ProcessingResult,
    pub occurred_at: DateTime<Utc>,
}

impl MessageProcessed {
    /// Idempotency key of the billing engine.
    pub fn message_id(&self) -> &str {
        &self.inbound.message_id
    }
}

/// Typed events carried over the durable queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    MessageProcessed(MessageProcessed),
}

/// Outbound alerts for the subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    LowQuota {
        subscriber_id: i64,
        remaining_messages: i64,
        threshold_percent: u8,
    },
    WalletDebited {
        subscriber_id: i64,
        amount_cents: i64,
        new_balance_cents: i64,
        currency: String,
    },
}

impl Notification {
    pub fn subscriber_id(&self) -> i64 {
        match self {
            Notification::LowQuota { subscriber_id, .. }
            | Notification::WalletDebited { subscriber_id, .. } => *subscriber_id,
        }
    }

    /// Short kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::LowQuota { .. } => "low_quota",
            Notification::WalletDebited { .. } => "wallet_debited",
        }
    }
}
