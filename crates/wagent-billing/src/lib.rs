// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage billing for the wagent pipeline.
//!
//! This crate provides:
//! - **Cost model**: unit prices per AI reply, product card and media item
//! - **Engine**: quota-versus-overage decisions and low-quota crossings
//! - **Ledger**: idempotent, transactional charging of processed messages
//! - **Service and worker**: queue consumption, notifications and the pre-check gate

pub mod engine;
pub mod ledger;
pub mod notify;
pub mod service;
pub mod units;
pub mod worker;

pub use engine::{ChargeOutcome, ChargePlan, QuotaSnapshot};
pub use ledger::{ChargeRequest, UsageLedger, UsageSummary};
pub use notify::{TracingNotifier, WebhookNotifier, notifier_from_config};
pub use service::BillingService;
pub use units::CostModel;
pub use worker::BillingWorker;
