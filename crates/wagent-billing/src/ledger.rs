// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage ledger persisted in SQLite.
//!
//! Every charge runs inside one `BEGIN IMMEDIATE` transaction: the idempotency
//! row, the quota read, the wallet read and every resulting write commit or
//! roll back together. The write lock is taken up front, so two charges for the
//! same subscriber can never both spend the last quota unit or the same cents.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, Transaction, TransactionBehavior, params};
use tracing::{debug, info};
use wagent_core::WagentError;
use wagent_core::billing::{
    BillableUnits, MessageProcessed, TransactionKind, UsageCounter, Wallet, WalletTransaction,
};
use wagent_storage::codec::{enum_column, format_ts, opt_ts_column, ts_column};
use wagent_storage::queries::subscriptions::current_subscription_sync;
use wagent_storage::{Database, map_tr_err};

use crate::engine::{ChargeOutcome, ChargePlan, QuotaSnapshot, plan_charge};
use crate::units::CostModel;

const TRANSACTION_COLUMNS: &str = "id, subscriber_id, kind, amount_cents, balance_after_cents, \
     reference, description, created_at";

const COUNTER_COLUMNS: &str = "subscription_id, account_id, messages_used, \
     overage_messages_used, overage_cost_paid_cents, last_message_at, last_overage_payment_at";

/// One message to be charged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub account_id: i64,
    pub subscriber_id: i64,
    pub message_id: String,
    pub units: BillableUnits,
}

impl ChargeRequest {
    pub fn from_event(event: &MessageProcessed) -> Self {
        Self {
            account_id: event.account_id,
            subscriber_id: event.subscriber_id,
            message_id: event.message_id().to_string(),
            units: BillableUnits::from_result(&event.result),
        }
    }

    fn reference(&self) -> String {
        format!("message:{}:{}", self.account_id, self.message_id)
    }
}

/// Quota and wallet position of a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSummary {
    pub subscription_id: i64,
    pub package_name: String,
    pub quota: QuotaSnapshot,
    pub balance_cents: i64,
    pub ends_at: DateTime<Utc>,
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<WalletTransaction> {
    Ok(WalletTransaction {
        id: row.get(0)?,
        subscriber_id: row.get(1)?,
        kind: enum_column(row, 2)?,
        amount_cents: row.get(3)?,
        balance_after_cents: row.get(4)?,
        reference: row.get(5)?,
        description: row.get(6)?,
        created_at: ts_column(row, 7)?,
    })
}

fn counter_from_row(row: &Row<'_>) -> rusqlite::Result<UsageCounter> {
    Ok(UsageCounter {
        subscription_id: row.get(0)?,
        account_id: row.get(1)?,
        messages_used: row.get(2)?,
        overage_messages_used: row.get(3)?,
        overage_cost_paid_cents: row.get(4)?,
        last_message_at: opt_ts_column(row, 5)?,
        last_overage_payment_at: opt_ts_column(row, 6)?,
    })
}

fn quota_used(conn: &rusqlite::Connection, subscription_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(SUM(messages_used), 0) FROM usage_counters WHERE subscription_id = ?1",
        params![subscription_id],
        |row| row.get(0),
    )
}

fn wallet_balance(conn: &rusqlite::Connection, subscriber_id: i64) -> rusqlite::Result<i64> {
    Ok(conn
        .query_row(
            "SELECT balance_cents FROM wallets WHERE subscriber_id = ?1",
            params![subscriber_id],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0))
}

#[allow(clippy::too_many_arguments)]
fn insert_transaction(
    tx: &Transaction<'_>,
    subscriber_id: i64,
    kind: TransactionKind,
    amount_cents: i64,
    balance_after_cents: i64,
    reference: Option<&str>,
    description: &str,
    now: &str,
) -> rusqlite::Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO wallet_transactions (id, subscriber_id, kind, amount_cents,
             balance_after_cents, reference, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            subscriber_id,
            kind.to_string(),
            amount_cents,
            balance_after_cents,
            reference,
            description,
            now,
        ],
    )?;
    Ok(id)
}

/// Apply the plan and return the outcome. Runs inside the caller's transaction.
fn settle(
    tx: &Transaction<'_>,
    request: &ChargeRequest,
    subscription_id: i64,
    limit: i64,
    plan: ChargePlan,
    now: &str,
) -> rusqlite::Result<ChargeOutcome> {
    match plan {
        ChargePlan::NothingToBill => Ok(ChargeOutcome::NothingToBill),
        ChargePlan::Quota {
            units_recorded,
            remaining_before,
            remaining_after,
        } => {
            tx.execute(
                "INSERT INTO usage_counters (subscription_id, account_id, messages_used, last_message_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(subscription_id, account_id) DO UPDATE SET
                     messages_used = messages_used + excluded.messages_used,
                     last_message_at = excluded.last_message_at",
                params![subscription_id, request.account_id, units_recorded, now],
            )?;
            Ok(ChargeOutcome::Quota {
                subscription_id,
                units_recorded,
                remaining_before,
                remaining_after,
                limit,
            })
        }
        ChargePlan::Overage { units, cost_cents } => {
            let (new_balance_cents, transaction_id) = if cost_cents > 0 {
                let debited: Option<i64> = tx
                    .query_row(
                        "UPDATE wallets SET balance_cents = balance_cents - ?1, updated_at = ?3
                         WHERE subscriber_id = ?2 AND balance_cents >= ?1
                         RETURNING balance_cents",
                        params![cost_cents, request.subscriber_id, now],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(balance) = debited else {
                    return Ok(ChargeOutcome::InsufficientFunds {
                        subscription_id,
                        cost_cents,
                        balance_cents: wallet_balance(tx, request.subscriber_id)?,
                    });
                };
                let id = insert_transaction(
                    tx,
                    request.subscriber_id,
                    TransactionKind::Debit,
                    cost_cents,
                    balance,
                    Some(&request.reference()),
                    &format!("overage: {units} message units"),
                    now,
                )?;
                (balance, Some(id))
            } else {
                (wallet_balance(tx, request.subscriber_id)?, None)
            };

            tx.execute(
                "INSERT INTO usage_counters (subscription_id, account_id, overage_messages_used,
                     overage_cost_paid_cents, last_message_at, last_overage_payment_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(subscription_id, account_id) DO UPDATE SET
                     overage_messages_used = overage_messages_used + excluded.overage_messages_used,
                     overage_cost_paid_cents = overage_cost_paid_cents + excluded.overage_cost_paid_cents,
                     last_message_at = excluded.last_message_at,
                     last_overage_payment_at = excluded.last_overage_payment_at",
                params![subscription_id, request.account_id, units, cost_cents, now],
            )?;
            Ok(ChargeOutcome::Overage {
                subscription_id,
                units,
                cost_cents,
                new_balance_cents,
                transaction_id,
            })
        }
        ChargePlan::InsufficientFunds {
            cost_cents,
            balance_cents,
        } => Ok(ChargeOutcome::InsufficientFunds {
            subscription_id,
            cost_cents,
            balance_cents,
        }),
    }
}

/// Subscription usage, wallets and their transaction history.
#[derive(Clone)]
pub struct UsageLedger {
    db: Database,
    currency: String,
}

impl UsageLedger {
    pub fn new(db: Database, currency: impl Into<String>) -> Self {
        Self {
            db,
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Charge one processed message exactly once.
    ///
    /// A second call with the same `(account_id, message_id)` returns
    /// [`ChargeOutcome::Duplicate`] and changes nothing.
    pub async fn apply_charge(
        &self,
        request: ChargeRequest,
        costs: CostModel,
        now: DateTime<Utc>,
    ) -> Result<ChargeOutcome, WagentError> {
        let now = format_ts(now);
        self.db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let claimed = tx.execute(
                    "INSERT OR IGNORE INTO billing_events
                         (account_id, message_id, subscriber_id, units, outcome, created_at)
                     VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                    params![
                        request.account_id,
                        request.message_id,
                        request.subscriber_id,
                        request.units.total(),
                        now,
                    ],
                )?;
                if claimed == 0 {
                    return Ok(ChargeOutcome::Duplicate);
                }

                let outcome = match current_subscription_sync(&tx, request.subscriber_id, &now)? {
                    None => ChargeOutcome::NoSubscription,
                    Some(sub) => {
                        let quota = QuotaSnapshot {
                            limit: sub.messages_limit,
                            used: quota_used(&tx, sub.id)?,
                        };
                        let balance = wallet_balance(&tx, request.subscriber_id)?;
                        let plan = plan_charge(quota, &request.units, balance, &costs);
                        settle(&tx, &request, sub.id, sub.messages_limit, plan, &now)?
                    }
                };

                tx.execute(
                    "UPDATE billing_events SET outcome = ?3, cost_cents = ?4
                     WHERE account_id = ?1 AND message_id = ?2",
                    params![
                        request.account_id,
                        request.message_id,
                        outcome.label(),
                        outcome.cost_cents(),
                    ],
                )?;
                tx.commit()?;
                Ok(outcome)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Whether the subscriber may start processing a message of `units` units.
    ///
    /// Requires a current subscription, and either enough quota for all
    /// `units` or a wallet balance covering the units the quota cannot.
    pub async fn can_process(
        &self,
        subscriber_id: i64,
        units: u32,
        costs: CostModel,
        now: DateTime<Utc>,
    ) -> Result<bool, WagentError> {
        let Some(summary) = self.summary(subscriber_id, now).await? else {
            debug!(subscriber_id, "no current subscription");
            return Ok(false);
        };
        let remaining = summary.quota.remaining();
        if remaining >= i64::from(units) {
            return Ok(true);
        }
        let shortfall = u32::try_from(i64::from(units) - remaining).unwrap_or(units);
        Ok(summary.balance_cents >= costs.estimate(shortfall))
    }

    /// Current quota and balance, or `None` without a current subscription.
    pub async fn summary(
        &self,
        subscriber_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageSummary>, WagentError> {
        let now = format_ts(now);
        self.db
            .connection()
            .call(move |conn| {
                let Some(sub) = current_subscription_sync(conn, subscriber_id, &now)? else {
                    return Ok(None);
                };
                Ok(Some(UsageSummary {
                    subscription_id: sub.id,
                    package_name: sub.package_name,
                    quota: QuotaSnapshot {
                        limit: sub.messages_limit,
                        used: quota_used(conn, sub.id)?,
                    },
                    balance_cents: wallet_balance(conn, subscriber_id)?,
                    ends_at: sub.ends_at,
                }))
            })
            .await
            .map_err(map_tr_err)
    }

    /// Add funds, creating the wallet on first use.
    pub async fn credit_wallet(
        &self,
        subscriber_id: i64,
        amount_cents: i64,
        reference: Option<&str>,
        description: &str,
    ) -> Result<WalletTransaction, WagentError> {
        if amount_cents <= 0 {
            return Err(WagentError::Billing(format!(
                "credit amount must be positive, got {amount_cents}"
            )));
        }
        let currency = self.currency.clone();
        let reference = reference.map(str::to_string);
        let description = description.to_string();
        let now = format_ts(Utc::now());

        let transaction = self
            .db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO wallets (subscriber_id, balance_cents, currency, updated_at)
                     VALUES (?1, 0, ?2, ?3)
                     ON CONFLICT(subscriber_id) DO NOTHING",
                    params![subscriber_id, currency, now],
                )?;
                let balance: i64 = tx.query_row(
                    "UPDATE wallets SET balance_cents = balance_cents + ?1, updated_at = ?3
                     WHERE subscriber_id = ?2
                     RETURNING balance_cents",
                    params![amount_cents, subscriber_id, now],
                    |row| row.get(0),
                )?;
                let id = insert_transaction(
                    &tx,
                    subscriber_id,
                    TransactionKind::Credit,
                    amount_cents,
                    balance,
                    reference.as_deref(),
                    &description,
                    &now,
                )?;
                let transaction = tx.query_row(
                    &format!("SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions WHERE id = ?1"),
                    params![id],
                    transaction_from_row,
                )?;
                tx.commit()?;
                Ok(transaction)
            })
            .await
            .map_err(map_tr_err)?;

        info!(
            subscriber_id,
            amount_cents,
            balance_cents = transaction.balance_after_cents,
            "wallet credited"
        );
        Ok(transaction)
    }

    pub async fn wallet(&self, subscriber_id: i64) -> Result<Option<Wallet>, WagentError> {
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT subscriber_id, balance_cents, currency FROM wallets WHERE subscriber_id = ?1",
                    params![subscriber_id],
                    |row| {
                        Ok(Wallet {
                            subscriber_id: row.get(0)?,
                            balance_cents: row.get(1)?,
                            currency: row.get(2)?,
                        })
                    },
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn usage_counter(
        &self,
        subscription_id: i64,
        account_id: i64,
    ) -> Result<Option<UsageCounter>, WagentError> {
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    &format!(
                        "SELECT {COUNTER_COLUMNS} FROM usage_counters
                         WHERE subscription_id = ?1 AND account_id = ?2"
                    ),
                    params![subscription_id, account_id],
                    counter_from_row,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Wallet history, oldest first.
    pub async fn transactions(
        &self,
        subscriber_id: i64,
    ) -> Result<Vec<WalletTransaction>, WagentError> {
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions
                     WHERE subscriber_id = ?1
                     ORDER BY created_at, rowid"
                ))?;
                let rows = stmt.query_map(params![subscriber_id], transaction_from_row)?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Recorded outcome label of a billed message.
    pub async fn event_outcome(
        &self,
        account_id: i64,
        message_id: &str,
    ) -> Result<Option<String>, WagentError> {
        let message_id = message_id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT outcome FROM billing_events WHERE account_id = ?1 AND message_id = ?2",
                    params![account_id, message_id],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }
}
