// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod accounts;
pub mod conversations;
pub mod messages;
pub mod products;
pub mod queue;
pub mod subscriptions;
