// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure billing decisions: quota versus overage, and low-quota crossings.
//!
//! The ledger reads a [`QuotaSnapshot`] and the wallet balance inside one
//! locked transaction, asks [`plan_charge`] what to do, and applies the plan
//! before releasing the lock.

use serde::Serialize;
use wagent_core::billing::BillableUnits;

use crate::units::CostModel;

/// Quota position of a subscription at the moment of charging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub limit: i64,
    pub used: i64,
}

impl QuotaSnapshot {
    /// Messages left in the cycle, never negative.
    pub fn remaining(&self) -> i64 {
        (self.limit - self.used).max(0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

/// What a message costs the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargePlan {
    NothingToBill,
    /// Counted against the quota. Units beyond the remaining quota are absorbed.
    Quota {
        units_recorded: i64,
        remaining_before: i64,
        remaining_after: i64,
    },
    /// Quota exhausted; the wallet pays.
    Overage { units: i64, cost_cents: i64 },
    /// Quota exhausted and the wallet cannot pay. Nothing changes.
    InsufficientFunds { cost_cents: i64, balance_cents: i64 },
}

pub fn plan_charge(
    quota: QuotaSnapshot,
    units: &BillableUnits,
    balance_cents: i64,
    costs: &CostModel,
) -> ChargePlan {
    if units.is_empty() {
        return ChargePlan::NothingToBill;
    }
    let total = i64::from(units.total());

    let remaining = quota.remaining();
    if remaining > 0 {
        let recorded = total.min(remaining);
        return ChargePlan::Quota {
            units_recorded: recorded,
            remaining_before: remaining,
            remaining_after: remaining - recorded,
        };
    }

    let cost_cents = costs.cost_of(units);
    if balance_cents >= cost_cents {
        ChargePlan::Overage {
            units: total,
            cost_cents,
        }
    } else {
        ChargePlan::InsufficientFunds {
            cost_cents,
            balance_cents,
        }
    }
}

/// Remaining-message count at or below which the subscriber is alerted.
pub fn low_quota_threshold(limit: i64, percent: u8) -> i64 {
    limit * i64::from(percent) / 100
}

/// True only for the charge that moves remaining quota from above the
/// threshold to at or below it.
pub fn crossed_low_quota(limit: i64, before: i64, after: i64, percent: u8) -> bool {
    if limit <= 0 {
        return false;
    }
    let threshold = low_quota_threshold(limit, percent);
    before > threshold && after <= threshold
}

/// Result of charging one processed-message event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChargeOutcome {
    /// The event was charged before.
    Duplicate,
    NoSubscription,
    NothingToBill,
    Quota {
        subscription_id: i64,
        units_recorded: i64,
        remaining_before: i64,
        remaining_after: i64,
        limit: i64,
    },
    Overage {
        subscription_id: i64,
        units: i64,
        cost_cents: i64,
        new_balance_cents: i64,
        /// Absent when the overage price is zero.
        transaction_id: Option<String>,
    },
    InsufficientFunds {
        subscription_id: i64,
        cost_cents: i64,
        balance_cents: i64,
    },
}

impl ChargeOutcome {
    /// Value stored in `billing_events.outcome`.
    pub fn label(&self) -> &'static str {
        match self {
            ChargeOutcome::Duplicate => "duplicate",
            ChargeOutcome::NoSubscription => "no_subscription",
            ChargeOutcome::NothingToBill => "nothing_to_bill",
            ChargeOutcome::Quota { .. } => "quota",
            ChargeOutcome::Overage { .. } => "overage",
            ChargeOutcome::InsufficientFunds { .. } => "insufficient_funds",
        }
    }

    /// Money taken from the wallet.
    pub fn cost_cents(&self) -> i64 {
        match self {
            ChargeOutcome::Overage { cost_cents, .. } => *cost_cents,
            _ => 0,
        }
    }
}
