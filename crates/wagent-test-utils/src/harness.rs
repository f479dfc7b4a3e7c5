// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full pipeline (storage, orchestrator, inbound
//! handler, billing service and both queue workers) over a temp SQLite
//! database, with a scripted vendor and recording outbound adapters.

use std::sync::Arc;

use chrono::{Duration, Utc};

use wagent_agent::{
    InboundHandler, InboundWorker, MessageOrchestrator, ProductEnricher, TimingSimulator,
};
use wagent_billing::{BillingService, BillingWorker, UsageLedger, UsageSummary};
use wagent_config::model::{
    BillingConfig, ContextConfig, ProviderConfig, StorageConfig, TimingConfig, WorkerConfig,
};
use wagent_context::ContextEngine;
use wagent_core::WagentError;
use wagent_core::types::{AiSettings, InboundMessage, MessageType, ProcessingResult, Product};
use wagent_provider::CompletionGateway;
use wagent_storage::queries::accounts::{NewAccount, insert_account, insert_subscriber};
use wagent_storage::queries::products::{NewProduct, insert_product};
use wagent_storage::queries::queue;
use wagent_storage::queries::subscriptions::{NewSubscription, insert_subscription};
use wagent_storage::{BILLING_QUEUE, Database, INBOUND_QUEUE, QueuePublisher, SqliteStorage};

use crate::mock_channel::{RecordingChannel, RecordingNotifier};
use crate::mock_provider::MockProvider;

/// Chat id used by [`TestHarness::inbound`].
pub const TEST_CHAT_ID: &str = "5511988887777@c.us";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    quota: Option<i64>,
    wallet_cents: i64,
    billing: BillingConfig,
    ai: AiSettings,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            quota: Some(100),
            wallet_cents: 0,
            billing: BillingConfig::default(),
            ai: AiSettings::default(),
        }
    }

    /// Set scripted vendor completions.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Message quota of the seeded subscription (default 100).
    pub fn with_quota(mut self, messages_limit: i64) -> Self {
        self.quota = Some(messages_limit);
        self
    }

    /// Seed no subscription at all.
    pub fn without_subscription(mut self) -> Self {
        self.quota = None;
        self
    }

    /// Prepaid wallet balance (default empty).
    pub fn with_wallet(mut self, balance_cents: i64) -> Self {
        self.wallet_cents = balance_cents;
        self
    }

    pub fn with_billing(mut self, billing: BillingConfig) -> Self {
        self.billing = billing;
        self
    }

    /// AI settings of the seeded account.
    pub fn with_ai(mut self, ai: AiSettings) -> Self {
        self.ai = ai;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, WagentError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| WagentError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();
        let db = Database::open(&db_path).await?;
        let storage = Arc::new(SqliteStorage::with_database(
            StorageConfig {
                database_path: db_path,
                wal_mode: true,
            },
            db.clone(),
        ));

        let subscriber_id =
            insert_subscriber(&db, "Boutique Teste", Some("loja@example.com")).await?;
        let account = insert_account(
            &db,
            NewAccount {
                subscriber_id,
                name: "Boutique Teste".to_string(),
                phone: Some("5511900000000".to_string()),
                ai: self.ai,
            },
        )
        .await?;

        let subscription_id = match self.quota {
            Some(messages_limit) => {
                let now = Utc::now();
                let subscription = insert_subscription(
                    &db,
                    NewSubscription {
                        subscriber_id,
                        package_name: "test".to_string(),
                        messages_limit,
                        products_limit: None,
                        accounts_limit: None,
                        starts_at: now - Duration::days(1),
                        ends_at: now + Duration::days(29),
                    },
                )
                .await?;
                Some(subscription.id)
            }
            None => None,
        };

        let ledger = UsageLedger::new(db.clone(), self.billing.currency.clone());
        if self.wallet_cents > 0 {
            ledger
                .credit_wallet(subscriber_id, self.wallet_cents, Some("seed"), "test top-up")
                .await?;
        }

        let notifier = Arc::new(RecordingNotifier::new());
        let billing = Arc::new(BillingService::new(
            ledger.clone(),
            &self.billing,
            notifier.clone(),
        ));

        let provider = Arc::new(MockProvider::with_responses(self.responses));
        let gateway =
            CompletionGateway::new(&ProviderConfig::default()).with_provider(provider.clone());
        let context = ContextConfig::default();
        let enricher = ProductEnricher::new(
            storage.clone(),
            context.catalog_excerpt_limit,
            context.catalog_reply_limit,
        );
        let orchestrator = Arc::new(MessageOrchestrator::new(
            ContextEngine::new(context),
            Arc::new(gateway),
            enricher,
            TimingSimulator::new(TimingConfig::default()),
            Arc::new(QueuePublisher::new(db.clone())),
        ));

        let channel = Arc::new(RecordingChannel::new());
        let handler = Arc::new(
            InboundHandler::new(storage.clone(), billing.clone(), orchestrator, channel.clone())
                .with_estimated_units(self.billing.estimated_units_per_message),
        );

        let workers = WorkerConfig::default();
        Ok(TestHarness {
            inbound_worker: InboundWorker::new(db.clone(), handler.clone(), &workers),
            billing_worker: BillingWorker::new(db.clone(), billing.clone(), &workers),
            handler,
            billing,
            ledger,
            provider,
            channel,
            notifier,
            storage,
            db,
            subscriber_id,
            account_id: account.id,
            subscription_id,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub db: Database,
    pub storage: Arc<SqliteStorage>,
    pub provider: Arc<MockProvider>,
    pub channel: Arc<RecordingChannel>,
    pub notifier: Arc<RecordingNotifier>,
    pub ledger: UsageLedger,
    pub billing: Arc<BillingService>,
    pub handler: Arc<InboundHandler>,
    pub inbound_worker: InboundWorker,
    pub billing_worker: BillingWorker,
    pub subscriber_id: i64,
    pub account_id: i64,
    pub subscription_id: Option<i64>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A text message from [`TEST_CHAT_ID`] to the seeded account.
    pub fn inbound(&self, message_id: &str, body: &str) -> InboundMessage {
        InboundMessage {
            message_id: message_id.to_string(),
            account_id: self.account_id,
            sender_id: TEST_CHAT_ID.to_string(),
            body: body.to_string(),
            timestamp: Utc::now(),
            message_type: MessageType::Text,
            is_group: false,
            chat_name: Some("Cliente".to_string()),
            metadata: None,
        }
    }

    /// Run one message through the inbound handler, bypassing the queue.
    pub async fn send_message(
        &self,
        message_id: &str,
        body: &str,
    ) -> Result<ProcessingResult, WagentError> {
        self.handler.handle(self.inbound(message_id, body)).await
    }

    /// Queue a message as the webhook would.
    pub async fn enqueue_message(&self, message_id: &str, body: &str) -> Result<i64, WagentError> {
        let payload = serde_json::to_string(&self.inbound(message_id, body))
            .map_err(|e| WagentError::Internal(e.to_string()))?;
        queue::enqueue(&self.db, INBOUND_QUEUE, &payload).await
    }

    /// Drain the inbound queue. Returns the number of entries taken.
    pub async fn process_inbound(&self) -> Result<usize, WagentError> {
        let mut taken = 0;
        while self.inbound_worker.process_next().await? {
            taken += 1;
        }
        Ok(taken)
    }

    /// Drain the billing queue. Returns the number of events taken.
    pub async fn settle_billing(&self) -> Result<usize, WagentError> {
        let mut taken = 0;
        while self.billing_worker.process_next().await? {
            taken += 1;
        }
        Ok(taken)
    }

    pub async fn billing_backlog(&self) -> Result<i64, WagentError> {
        queue::backlog(&self.db, BILLING_QUEUE).await
    }

    /// Add an active product to the subscriber's catalog.
    pub async fn add_product(
        &self,
        title: &str,
        price_cents: i64,
        media: &[&str],
    ) -> Result<Product, WagentError> {
        insert_product(
            &self.db,
            NewProduct {
                subscriber_id: self.subscriber_id,
                title: title.to_string(),
                description: format!("{title} de teste"),
                price_cents,
                media: media.iter().map(|m| m.to_string()).collect(),
            },
        )
        .await
    }

    pub async fn summary(&self) -> Result<Option<UsageSummary>, WagentError> {
        self.ledger.summary(self.subscriber_id, Utc::now()).await
    }

    /// Wallet balance, zero when no wallet exists yet.
    pub async fn balance_cents(&self) -> Result<i64, WagentError> {
        Ok(self
            .ledger
            .wallet(self.subscriber_id)
            .await?
            .map(|w| w.balance_cents)
            .unwrap_or(0))
    }
}
