// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message log.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use wagent_core::WagentError;
use wagent_core::types::{Direction, Message, NewMessage};

use crate::codec::{enum_column, format_ts, ts_column};
use crate::database::{Database, map_tr_err};

const MESSAGE_COLUMNS: &str = "id, conversation_id, external_id, direction, content, \
     message_type, ai_generated, model, confidence, created_at";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let confidence: Option<f64> = row.get(8)?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        external_id: row.get(2)?,
        direction: enum_column(row, 3)?,
        content: row.get(4)?,
        message_type: enum_column(row, 5)?,
        ai_generated: row.get(6)?,
        model: row.get(7)?,
        confidence: confidence.map(|c| c as f32),
        created_at: ts_column(row, 9)?,
    })
}

/// Append a message and bump the conversation's activity in one transaction.
///
/// Inbound messages increment the unread counter; outbound ones reset it.
/// Returns `None`, leaving the conversation untouched, when a message with the
/// same external id is already recorded in the conversation.
pub async fn append_message(
    db: &Database,
    msg: NewMessage,
) -> Result<Option<Message>, WagentError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let created_at = format_ts(msg.created_at);
            let message = tx.query_row(
                &format!(
                    "INSERT INTO messages (conversation_id, external_id, direction, content,
                         message_type, ai_generated, model, confidence, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT (conversation_id, external_id) DO NOTHING
                     RETURNING {MESSAGE_COLUMNS}"
                ),
                params![
                    msg.conversation_id,
                    msg.external_id,
                    msg.direction.to_string(),
                    msg.content,
                    msg.message_type.to_string(),
                    msg.ai_generated,
                    msg.model,
                    msg.confidence.map(f64::from),
                    created_at,
                ],
                message_from_row,
            )
            .optional()?;
            let Some(message) = message else {
                return Ok(None);
            };

            let unread = match msg.direction {
                Direction::Inbound => "unread_count + 1",
                Direction::Outbound => "0",
            };
            tx.execute(
                &format!(
                    "UPDATE conversations
                     SET last_message_at = MAX(COALESCE(last_message_at, ''), ?1),
                         unread_count = {unread}
                     WHERE id = ?2"
                ),
                params![created_at, msg.conversation_id],
            )?;
            tx.commit()?;
            Ok(Some(message))
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation created at or after `since`, oldest first.
///
/// When more than `limit` qualify, the most recent `limit` are kept.
pub async fn recent_messages(
    db: &Database,
    conversation_id: i64,
    since: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<Message>, WagentError> {
    let since = format_ts(since);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM (
                     SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE conversation_id = ?1 AND created_at >= ?2
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?3
                 ) ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id, since, limit], message_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Total number of messages in a conversation.
pub async fn count_messages(db: &Database, conversation_id: i64) -> Result<i64, WagentError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
