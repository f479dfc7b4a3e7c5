// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook gateway and reply delivery for the messaging bridge.
//!
//! Inbound: the bridge POSTs each WhatsApp message to `/webhook/{account_id}`;
//! the gateway verifies the signature, queues the message and answers 202.
//! The AI is never called on the request path.
//!
//! Outbound: [`BridgeChannel`] hands processing results back to the bridge.

pub mod auth;
pub mod bridge;
pub mod handlers;
pub mod server;

pub use auth::WebhookAuth;
pub use bridge::BridgeChannel;
pub use server::{GatewayState, router, serve};
