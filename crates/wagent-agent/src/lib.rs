// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message orchestration for wagent.
//!
//! An inbound WhatsApp message flows through:
//! - [`InboundHandler`]: records it, applies the account's AI gate and the
//!   billing pre-check
//! - [`MessageOrchestrator`]: builds context, asks the completion gateway,
//!   parses the action marker, enriches products and computes timing
//! - [`InboundWorker`]: drains the `inbound` queue with bounded concurrency
//!
//! Billing happens downstream from the `MessageProcessed` event.

pub mod enricher;
pub mod inbound;
pub mod orchestrator;
pub mod parser;
pub mod shutdown;
pub mod timing;
pub mod worker;

pub use enricher::ProductEnricher;
pub use inbound::InboundHandler;
pub use orchestrator::MessageOrchestrator;
pub use parser::parse_response;
pub use shutdown::{drain_tasks, install_signal_handler};
pub use timing::TimingSimulator;
pub use worker::InboundWorker;
