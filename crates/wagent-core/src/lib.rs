// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the wagent messaging pipeline.
//!
//! This crate provides the error type, domain types, and adapter traits
//! shared by storage, the reply pipeline, and the billing engine.

pub mod billing;
pub mod error;
pub mod marker;
pub mod traits;
pub mod types;

pub use billing::{
    BillableUnits, DomainEvent, MessageProcessed, Notification, Subscription,
    SubscriptionStatus, TransactionKind, UnitKind, UsageCounter, Wallet, WalletTransaction,
};
pub use error::WagentError;
pub use marker::{ActionMarker, Intent};
pub use types::{
    Account, AdapterType, Completion, CompletionRequest, Conversation, HealthStatus,
    InboundMessage, Message, ModelConfig, ProcessingResult, ProductData, TokenUsage,
};

pub use traits::{
    CatalogStore, EventPublisher, NotificationSink, PluginAdapter, ProviderAdapter,
    ReplyChannel, StorageAdapter, UsageGate,
};
