// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::WagentError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Account, Conversation, Message, NewConversation, NewMessage};

/// Conversation Store plus account lookup.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), WagentError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), WagentError>;

    async fn get_account(&self, account_id: i64) -> Result<Option<Account>, WagentError>;

    /// Returns the conversation for `(account_id, external_chat_id)`, creating it if absent.
    ///
    /// Concurrent first contacts resolve to the same row.
    async fn find_or_create_conversation(
        &self,
        account_id: i64,
        new: NewConversation,
    ) -> Result<Conversation, WagentError>;

    /// Appends to the message log and touches the conversation.
    ///
    /// Returns `None` when the conversation already holds a message with the
    /// same external id.
    async fn append_message(&self, message: NewMessage) -> Result<Option<Message>, WagentError>;

    /// Messages created at or after `since`, newest `limit` of them, oldest first.
    async fn recent_messages(
        &self,
        conversation_id: i64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Message>, WagentError>;
}
