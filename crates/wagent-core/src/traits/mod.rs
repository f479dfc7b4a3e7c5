// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod catalog;
pub mod channel;
pub mod events;
pub mod notification;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use catalog::CatalogStore;
pub use channel::ReplyChannel;
pub use events::{EventPublisher, UsageGate};
pub use notification::NotificationSink;
pub use provider::ProviderAdapter;
pub use storage::StorageAdapter;
