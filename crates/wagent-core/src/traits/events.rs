// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between reply generation and billing.

use async_trait::async_trait;

use crate::billing::DomainEvent;
use crate::error::WagentError;

/// Publishes domain events with at-least-once delivery.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent) -> Result<(), WagentError>;
}

/// Affordability pre-check consulted before generating a reply.
#[async_trait]
pub trait UsageGate: Send + Sync {
    /// True if the current quota covers `estimated_units` or the wallet can pay for them.
    async fn can_process_message(
        &self,
        subscriber_id: i64,
        estimated_units: u32,
    ) -> Result<bool, WagentError>;
}
