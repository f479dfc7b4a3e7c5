// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound worker: drains the `inbound` queue into the [`InboundHandler`].
//!
//! Up to `inbound_concurrency` messages run at once. Messages of the same
//! chat are serialized through a per-chat lock so replies keep their order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use wagent_config::model::WorkerConfig;
use wagent_core::WagentError;
use wagent_core::types::InboundMessage;
use wagent_storage::queries::queue::{self, QueueEntry};
use wagent_storage::{Database, INBOUND_QUEUE};

use crate::inbound::InboundHandler;
use crate::shutdown::drain_tasks;

type ChatKey = (i64, String);

/// One async mutex per chat currently being handled.
#[derive(Default)]
struct ChatLocks {
    inner: Mutex<HashMap<ChatKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ChatLocks {
    fn lock_for(&self, key: &ChatKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.entry(key.clone()).or_default().clone()
    }

    /// Forget the lock once nobody else holds or waits on it.
    fn release(&self, key: &ChatKey, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if Arc::strong_count(&lock) == 2 {
            map.remove(key);
        }
    }
}

pub struct InboundWorker {
    db: Database,
    handler: Arc<InboundHandler>,
    poll_interval: Duration,
    concurrency: usize,
    locks: Arc<ChatLocks>,
}

impl InboundWorker {
    pub fn new(db: Database, handler: Arc<InboundHandler>, config: &WorkerConfig) -> Self {
        Self {
            db,
            handler,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            concurrency: config.inbound_concurrency.max(1),
            locks: Arc::new(ChatLocks::default()),
        }
    }

    /// Run until `cancel` fires, then wait up to `drain_timeout` for messages in flight.
    pub async fn run(self, cancel: CancellationToken, drain_timeout: Duration) {
        info!(concurrency = self.concurrency, "inbound worker started");
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let tracker = TaskTracker::new();

        loop {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match queue::dequeue(&self.db, INBOUND_QUEUE, queue::DEFAULT_LOCK_SECS).await {
                Ok(Some(entry)) => {
                    let db = self.db.clone();
                    let handler = self.handler.clone();
                    let locks = self.locks.clone();
                    tracker.spawn(async move {
                        process_entry(&db, &handler, &locks, entry).await;
                        drop(permit);
                    });
                    continue;
                }
                Ok(None) => drop(permit),
                Err(e) => {
                    drop(permit);
                    error!(error = %e, "inbound queue poll failed");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        drain_tasks(&tracker, drain_timeout).await;
        info!("inbound worker stopped");
    }

    /// Handle the oldest pending message inline. Returns false when the queue is empty.
    pub async fn process_next(&self) -> Result<bool, WagentError> {
        let Some(entry) =
            queue::dequeue(&self.db, INBOUND_QUEUE, queue::DEFAULT_LOCK_SECS).await?
        else {
            return Ok(false);
        };
        process_entry(&self.db, &self.handler, &self.locks, entry).await;
        Ok(true)
    }
}

async fn process_entry(db: &Database, handler: &InboundHandler, locks: &ChatLocks, entry: QueueEntry) {
    let inbound: InboundMessage = match serde_json::from_str(&entry.payload) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!(entry_id = entry.id, error = %e, "undecodable inbound message");
            settle_failure(db, entry.id).await;
            return;
        }
    };

    let key = (inbound.account_id, inbound.sender_id.clone());
    let lock = locks.lock_for(&key);
    let outcome = {
        let _guard = lock.lock().await;
        handler.handle(inbound).await
    };
    locks.release(&key, lock);

    match outcome {
        Ok(result) => {
            debug!(
                entry_id = entry.id,
                has_reply = result.has_reply,
                skip_reason = ?result.skip_reason,
                "inbound message handled"
            );
            if let Err(e) = queue::ack(db, entry.id).await {
                error!(entry_id = entry.id, error = %e, "failed to ack inbound message");
            }
        }
        Err(e) => {
            warn!(entry_id = entry.id, error = %e, "inbound message failed");
            settle_failure(db, entry.id).await;
        }
    }
}

async fn settle_failure(db: &Database, id: i64) {
    match queue::fail(db, id).await {
        Ok(true) => error!(entry_id = id, "inbound message abandoned after final attempt"),
        Ok(false) => {}
        Err(e) => error!(entry_id = id, error = %e, "failed to record inbound failure"),
    }
}
