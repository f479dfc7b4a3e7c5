// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain event publishing onto the durable queue.

use async_trait::async_trait;
use tracing::debug;
use wagent_core::{DomainEvent, EventPublisher, WagentError};

use crate::database::Database;
use crate::queries::queue;

/// Queue consumed by the billing worker.
pub const BILLING_QUEUE: &str = "billing";
/// Queue fed by the webhook and consumed by the inbound worker.
pub const INBOUND_QUEUE: &str = "inbound";

/// Publishes each [`DomainEvent`] as a JSON row of the `billing` queue.
#[derive(Clone)]
pub struct QueuePublisher {
    db: Database,
    queue_name: String,
}

impl QueuePublisher {
    pub fn new(db: Database) -> Self {
        Self::with_queue(db, BILLING_QUEUE)
    }

    pub fn with_queue(db: Database, queue_name: impl Into<String>) -> Self {
        Self {
            db,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for QueuePublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), WagentError> {
        let payload = serde_json::to_string(&event)
            .map_err(|e| WagentError::Internal(format!("failed to encode event: {e}")))?;
        let id = queue::enqueue(&self.db, &self.queue_name, &payload).await?;
        debug!(queue = %self.queue_name, entry_id = id, "event published");
        Ok(())
    }
}
