// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Billing service: charges processed messages and alerts subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use wagent_config::model::BillingConfig;
use wagent_core::billing::{MessageProcessed, Notification};
use wagent_core::{NotificationSink, UsageGate, WagentError};

use crate::engine::{ChargeOutcome, crossed_low_quota};
use crate::ledger::{ChargeRequest, UsageLedger};
use crate::units::CostModel;

pub struct BillingService {
    ledger: UsageLedger,
    costs: CostModel,
    threshold_percent: u8,
    notifier: Arc<dyn NotificationSink>,
}

impl BillingService {
    pub fn new(
        ledger: UsageLedger,
        config: &BillingConfig,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            ledger,
            costs: CostModel::from_config(config),
            threshold_percent: config.low_quota_threshold_percent,
            notifier,
        }
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn costs(&self) -> CostModel {
        self.costs
    }

    /// Charge one processed message. Subscription validity is judged at the
    /// time the message was processed, not when the event is consumed.
    pub async fn handle_event(
        &self,
        event: &MessageProcessed,
    ) -> Result<ChargeOutcome, WagentError> {
        let request = ChargeRequest::from_event(event);
        let message_id = request.message_id.clone();
        let outcome = self
            .ledger
            .apply_charge(request, self.costs, event.occurred_at)
            .await?;

        match &outcome {
            ChargeOutcome::Duplicate => {
                debug!(account_id = event.account_id, %message_id, "already charged");
            }
            ChargeOutcome::NoSubscription => {
                warn!(
                    subscriber_id = event.subscriber_id,
                    %message_id,
                    "message processed without a current subscription"
                );
            }
            ChargeOutcome::NothingToBill => {}
            ChargeOutcome::Quota {
                units_recorded,
                remaining_before,
                remaining_after,
                limit,
                ..
            } => {
                debug!(
                    subscriber_id = event.subscriber_id,
                    units = units_recorded,
                    remaining = remaining_after,
                    "quota charged"
                );
                if crossed_low_quota(
                    *limit,
                    *remaining_before,
                    *remaining_after,
                    self.threshold_percent,
                ) {
                    self.send(Notification::LowQuota {
                        subscriber_id: event.subscriber_id,
                        remaining_messages: *remaining_after,
                        threshold_percent: self.threshold_percent,
                    })
                    .await;
                }
            }
            ChargeOutcome::Overage {
                units,
                cost_cents,
                new_balance_cents,
                ..
            } => {
                info!(
                    subscriber_id = event.subscriber_id,
                    units,
                    cost_cents,
                    balance_cents = new_balance_cents,
                    "overage charged to wallet"
                );
                if *cost_cents > 0 {
                    self.send(Notification::WalletDebited {
                        subscriber_id: event.subscriber_id,
                        amount_cents: *cost_cents,
                        new_balance_cents: *new_balance_cents,
                        currency: self.ledger.currency().to_string(),
                    })
                    .await;
                }
            }
            ChargeOutcome::InsufficientFunds {
                cost_cents,
                balance_cents,
                ..
            } => {
                warn!(
                    subscriber_id = event.subscriber_id,
                    %message_id,
                    cost_cents,
                    balance_cents,
                    shortfall_cents = cost_cents - balance_cents,
                    "quota exhausted and wallet cannot cover overage"
                );
            }
        }
        Ok(outcome)
    }

    async fn send(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!(
                error = %e,
                kind = notification.kind(),
                subscriber_id = notification.subscriber_id(),
                "failed to deliver notification"
            );
        }
    }
}

#[async_trait]
impl UsageGate for BillingService {
    async fn can_process_message(
        &self,
        subscriber_id: i64,
        estimated_units: u32,
    ) -> Result<bool, WagentError> {
        self.ledger
            .can_process(subscriber_id, estimated_units, self.costs, Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::Duration;
    use tracing_test::traced_test;
    use wagent_core::types::{AiSettings, InboundMessage, MessageType, ProcessingResult};
    use wagent_core::{AdapterType, HealthStatus, PluginAdapter};
    use wagent_storage::Database;
    use wagent_storage::queries::accounts::{NewAccount, insert_account, insert_subscriber};
    use wagent_storage::queries::subscriptions::{NewSubscription, insert_subscription};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Notification>>,
        fail: bool,
    }

    #[async_trait]
    impl PluginAdapter for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Notification
        }
        async fn health_check(&self) -> Result<HealthStatus, WagentError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), WagentError> {
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationSink for Recorder {
        async fn notify(&self, notification: &Notification) -> Result<(), WagentError> {
            self.seen.lock().unwrap().push(notification.clone());
            if self.fail {
                return Err(WagentError::Internal("sink down".into()));
            }
            Ok(())
        }
    }

    struct Setup {
        service: BillingService,
        recorder: Arc<Recorder>,
        account_id: i64,
        subscriber_id: i64,
        _dir: tempfile::TempDir,
    }

    async fn setup(limit: i64, fail_notify: bool) -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("svc.db").to_str().unwrap())
            .await
            .unwrap();
        let subscriber_id = insert_subscriber(&db, "Loja", None).await.unwrap();
        let account = insert_account(
            &db,
            NewAccount {
                subscriber_id,
                name: "main".into(),
                phone: None,
                ai: AiSettings::default(),
            },
        )
        .await
        .unwrap();
        let now = Utc::now();
        insert_subscription(
            &db,
            NewSubscription {
                subscriber_id,
                package_name: "basic".into(),
                messages_limit: limit,
                products_limit: None,
                accounts_limit: None,
                starts_at: now - Duration::days(1),
                ends_at: now + Duration::days(29),
            },
        )
        .await
        .unwrap();

        let recorder = Arc::new(Recorder {
            fail: fail_notify,
            ..Default::default()
        });
        let service = BillingService::new(
            UsageLedger::new(db, "BRL"),
            &BillingConfig::default(),
            recorder.clone(),
        );
        Setup {
            service,
            recorder,
            account_id: account.id,
            subscriber_id,
            _dir: dir,
        }
    }

    fn event(s: &Setup, message_id: &str) -> MessageProcessed {
        MessageProcessed {
            event_id: format!("evt-{message_id}"),
            account_id: s.account_id,
            subscriber_id: s.subscriber_id,
            inbound: InboundMessage {
                message_id: message_id.into(),
                account_id: s.account_id,
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
                reply_text: "Olá!".into(),
                ..ProcessingResult::without_reply()
            },
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn low_quota_alert_fires_once_while_draining() {
        let s = setup(10, false).await;
        for i in 0..10 {
            s.service.handle_event(&event(&s, &format!("m{i}"))).await.unwrap();
        }
        let seen = s.recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![Notification::LowQuota {
                subscriber_id: s.subscriber_id,
                remaining_messages: 2,
                threshold_percent: 20,
            }]
        );
    }

    #[tokio::test]
    async fn overage_notifies_wallet_debit() {
        let s = setup(0, false).await;
        s.service
            .ledger()
            .credit_wallet(s.subscriber_id, 100, None, "top-up")
            .await
            .unwrap();

        let outcome = s.service.handle_event(&event(&s, "m1")).await.unwrap();
        assert_eq!(outcome.label(), "overage");
        let seen = s.recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![Notification::WalletDebited {
                subscriber_id: s.subscriber_id,
                amount_cents: 5,
                new_balance_cents: 95,
                currency: "BRL".into(),
            }]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn notifier_failure_does_not_fail_the_charge() {
        let s = setup(0, true).await;
        s.service
            .ledger()
            .credit_wallet(s.subscriber_id, 100, None, "top-up")
            .await
            .unwrap();
        let outcome = s.service.handle_event(&event(&s, "m1")).await.unwrap();
        assert_eq!(outcome.cost_cents(), 5);
        assert_eq!(s.recorder.seen.lock().unwrap().len(), 1);
        assert!(logs_contain("failed to deliver notification"));
    }

    #[tokio::test]
    async fn gate_blocks_when_quota_and_wallet_are_empty() {
        let s = setup(1, false).await;
        assert!(s.service.can_process_message(s.subscriber_id, 1).await.unwrap());
        s.service.handle_event(&event(&s, "m1")).await.unwrap();
        assert!(!s.service.can_process_message(s.subscriber_id, 1).await.unwrap());
    }

    #[tokio::test]
    async fn replayed_event_is_duplicate() {
        let s = setup(10, false).await;
        let e = event(&s, "m1");
        assert_eq!(s.service.handle_event(&e).await.unwrap().label(), "quota");
        assert_eq!(
            s.service.handle_event(&e).await.unwrap(),
            ChargeOutcome::Duplicate
        );
    }
}
