// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the wagent pipeline.
//!
//! WAL-mode SQLite with embedded migrations, a single serialized connection via
//! `tokio-rusqlite`, typed queries for accounts, conversations, messages,
//! catalog and subscriptions, plus a crash-safe work queue.

pub mod adapter;
pub mod codec;
pub mod database;
pub mod migrations;
pub mod publisher;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::{Database, map_tr_err};
pub use publisher::{BILLING_QUEUE, INBOUND_QUEUE, QueuePublisher};
pub use queries::queue::QueueEntry;
