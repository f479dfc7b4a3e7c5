// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background consumer of the billing queue.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wagent_config::model::WorkerConfig;
use wagent_core::{DomainEvent, WagentError};
use wagent_storage::queries::{queue, subscriptions};
use wagent_storage::{BILLING_QUEUE, Database};

use crate::service::BillingService;

const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub struct BillingWorker {
    db: Database,
    service: Arc<BillingService>,
    poll_interval: Duration,
}

impl BillingWorker {
    pub fn new(db: Database, service: Arc<BillingService>, config: &WorkerConfig) -> Self {
        Self {
            db,
            service,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    /// Consume events until `cancel` fires. An event in progress is finished first.
    pub async fn run(self, cancel: CancellationToken) {
        info!("billing worker started");
        let mut last_sweep: Option<Instant> = None;

        while !cancel.is_cancelled() {
            if last_sweep.is_none_or(|t| t.elapsed() >= EXPIRY_SWEEP_INTERVAL) {
                if let Err(e) = subscriptions::expire_subscriptions(&self.db, Utc::now()).await {
                    warn!(error = %e, "subscription expiry sweep failed");
                }
                last_sweep = Some(Instant::now());
            }

            let idle = match self.process_next().await {
                Ok(handled) => !handled,
                Err(e) => {
                    error!(error = %e, "billing queue poll failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        info!("billing worker stopped");
    }

    /// Handle the oldest pending event. Returns false when the queue is empty.
    pub async fn process_next(&self) -> Result<bool, WagentError> {
        let Some(entry) =
            queue::dequeue(&self.db, BILLING_QUEUE, queue::DEFAULT_LOCK_SECS).await?
        else {
            return Ok(false);
        };

        let event: DomainEvent = match serde_json::from_str(&entry.payload) {
            Ok(event) => event,
            Err(e) => {
                let dead = queue::fail(&self.db, entry.id).await?;
                warn!(entry_id = entry.id, error = %e, dead, "undecodable billing event");
                return Ok(true);
            }
        };

        let result = match &event {
            DomainEvent::MessageProcessed(processed) => self.service.handle_event(processed).await,
        };

        match result {
            Ok(outcome) => {
                queue::ack(&self.db, entry.id).await?;
                debug!(entry_id = entry.id, outcome = outcome.label(), "billing event settled");
            }
            Err(e) => {
                let dead = queue::fail(&self.db, entry.id).await?;
                if dead {
                    error!(entry_id = entry.id, error = %e, "billing event abandoned");
                } else {
                    warn!(entry_id = entry.id, error = %e, "billing event will be retried");
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration as ChronoDuration;
    use wagent_config::model::BillingConfig;
    use wagent_core::types::{AiSettings, InboundMessage, MessageType, ProcessingResult};
    use wagent_core::{EventPublisher, MessageProcessed};
    use wagent_storage::QueuePublisher;
    use wagent_storage::queries::accounts::{NewAccount, insert_account, insert_subscriber};
    use wagent_storage::queries::subscriptions::{NewSubscription, insert_subscription};

    use crate::ledger::UsageLedger;
    use crate::notify::TracingNotifier;

    async fn worker() -> (BillingWorker, Database, i64, i64, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("w.db").to_str().unwrap())
            .await
            .unwrap();
        let subscriber_id = insert_subscriber(&db, "Loja", None).await.unwrap();
        let account_id = insert_account(
            &db,
            NewAccount {
                subscriber_id,
                name: "main".into(),
                phone: None,
                ai: AiSettings::default(),
            },
        )
        .await
        .unwrap()
        .id;
        let now = Utc::now();
        insert_subscription(
            &db,
            NewSubscription {
                subscriber_id,
                package_name: "basic".into(),
                messages_limit: 100,
                products_limit: None,
                accounts_limit: None,
                starts_at: now - ChronoDuration::days(1),
                ends_at: now + ChronoDuration::days(29),
            },
        )
        .await
        .unwrap();

        let service = BillingService::new(
            UsageLedger::new(db.clone(), "BRL"),
            &BillingConfig::default(),
            Arc::new(TracingNotifier),
        );
        let config = WorkerConfig {
            poll_interval_ms: 10,
            ..WorkerConfig::default()
        };
        (
            BillingWorker::new(db.clone(), Arc::new(service), &config),
            db,
            subscriber_id,
            account_id,
            dir,
        )
    }

    fn processed(account_id: i64, subscriber_id: i64, message_id: &str) -> DomainEvent {
        DomainEvent::MessageProcessed(MessageProcessed {
            event_id: format!("evt-{message_id}"),
            account_id,
            subscriber_id,
            inbound: InboundMessage {
                message_id: message_id.into(),
                account_id,
                sender_id: "5511999990000@c.us".into(),
                body: "oi".into(),
                timestamp: Utc::now(),
                message_type: MessageType::Text,
                is_group: false,
                chat_name: None,
                metadata: None,
            },
            result: ProcessingResult {
                has_reply: true,
                reply_text: "Olá".into(),
                ..ProcessingResult::without_reply()
            },
            occurred_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn settles_and_acks_published_events() {
        let (worker, db, subscriber_id, account_id, _dir) = worker().await;
        let publisher = QueuePublisher::new(db.clone());
        publisher
            .publish(processed(account_id, subscriber_id, "m1"))
            .await
            .unwrap();
        publisher
            .publish(processed(account_id, subscriber_id, "m1"))
            .await
            .unwrap();

        assert!(worker.process_next().await.unwrap());
        assert!(worker.process_next().await.unwrap());
        assert!(!worker.process_next().await.unwrap());
        assert_eq!(queue::backlog(&db, BILLING_QUEUE).await.unwrap(), 0);

        let ledger = UsageLedger::new(db, "BRL");
        let summary = ledger.summary(subscriber_id, Utc::now()).await.unwrap().unwrap();
        assert_eq!(summary.quota.used, 1);
    }

    #[tokio::test]
    async fn undecodable_payload_is_eventually_dead() {
        let (worker, db, ..) = worker().await;
        queue::enqueue(&db, BILLING_QUEUE, "{not json").await.unwrap();
        for _ in 0..3 {
            assert!(worker.process_next().await.unwrap());
        }
        assert!(!worker.process_next().await.unwrap());
        assert_eq!(queue::backlog(&db, BILLING_QUEUE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let (worker, ..) = worker().await;
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker should stop")
            .unwrap();
    }
}
