// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for wagent integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted AI vendor
//! - [`RecordingChannel`] - Reply channel capturing deliveries
//! - [`RecordingNotifier`] - Notification sink capturing alerts
//! - [`TestHarness`] - Full pipeline over a temp database

pub mod harness;
pub mod mock_channel;
pub mod mock_provider;

pub use harness::{TEST_CHAT_ID, TestHarness, TestHarnessBuilder};
pub use mock_channel::{Delivery, RecordingChannel, RecordingNotifier};
pub use mock_provider::MockProvider;
