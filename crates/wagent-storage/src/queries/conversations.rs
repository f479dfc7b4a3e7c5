// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lookup and lazy creation.

use rusqlite::{OptionalExtension, Row, params};
use wagent_core::WagentError;
use wagent_core::types::{Conversation, NewConversation};

use crate::codec::{opt_ts_column, ts_column};
use crate::database::{Database, map_tr_err};

const CONVERSATION_COLUMNS: &str = "id, account_id, external_chat_id, contact_name, contact_phone, \
     is_group, last_message_at, unread_count, created_at";

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        account_id: row.get(1)?,
        external_chat_id: row.get(2)?,
        contact_name: row.get(3)?,
        contact_phone: row.get(4)?,
        is_group: row.get(5)?,
        last_message_at: opt_ts_column(row, 6)?,
        unread_count: row.get(7)?,
        created_at: ts_column(row, 8)?,
    })
}

/// Find the conversation for `(account_id, external_chat_id)` or create it.
///
/// A single upsert statement, so concurrent first contacts converge on one row.
/// A contact name or phone supplied later fills in missing values.
pub async fn find_or_create(
    db: &Database,
    account_id: i64,
    new: NewConversation,
) -> Result<Conversation, WagentError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO conversations (account_id, external_chat_id, contact_name, contact_phone, is_group)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT (account_id, external_chat_id) DO UPDATE SET
                         contact_name = COALESCE(excluded.contact_name, conversations.contact_name),
                         contact_phone = COALESCE(excluded.contact_phone, conversations.contact_phone)
                     RETURNING {CONVERSATION_COLUMNS}"
                ),
                params![
                    account_id,
                    new.external_chat_id,
                    new.contact_name,
                    new.contact_phone,
                    new.is_group,
                ],
                conversation_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_conversation(db: &Database, id: i64) -> Result<Option<Conversation>, WagentError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Conversations of an account, most recently active first.
pub async fn list_for_account(
    db: &Database,
    account_id: i64,
) -> Result<Vec<Conversation>, WagentError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE account_id = ?1
                 ORDER BY last_message_at IS NULL, last_message_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![account_id], conversation_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::accounts::{NewAccount, insert_account, insert_subscriber};
    use tempfile::tempdir;
    use wagent_core::types::AiSettings;

    async fn setup() -> (Database, i64, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        let subscriber = insert_subscriber(&db, "s", None).await.unwrap();
        let account = insert_account(
            &db,
            NewAccount {
                subscriber_id: subscriber,
                name: "a".into(),
                phone: None,
                ai: AiSettings::default(),
            },
        )
        .await
        .unwrap();
        (db, account.id, dir)
    }

    fn chat(id: &str, name: Option<&str>) -> NewConversation {
        NewConversation {
            external_chat_id: id.into(),
            contact_name: name.map(str::to_string),
            contact_phone: None,
            is_group: false,
        }
    }

    #[tokio::test]
    async fn find_or_create_returns_same_row() {
        let (db, account_id, _dir) = setup().await;
        let first = find_or_create(&db, account_id, chat("5511@c.us", None))
            .await
            .unwrap();
        let second = find_or_create(&db, account_id, chat("5511@c.us", Some("Ana")))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.contact_name.as_deref(), Some("Ana"));
        assert_eq!(second.unread_count, 0);

        let third = find_or_create(&db, account_id, chat("5511@c.us", None))
            .await
            .unwrap();
        assert_eq!(third.contact_name.as_deref(), Some("Ana"));

        let other = find_or_create(&db, account_id, chat("5522@c.us", None))
            .await
            .unwrap();
        assert_ne!(other.id, first.id);
        assert_eq!(list_for_account(&db, account_id).await.unwrap().len(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_first_contact_creates_one_conversation() {
        let (db, account_id, _dir) = setup().await;
        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                find_or_create(&db, account_id, chat("group-1@g.us", None))
                    .await
                    .unwrap()
                    .id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "expected one conversation, got {ids:?}");
        assert!(get_conversation(&db, ids[0]).await.unwrap().is_some());
        db.close().await.unwrap();
    }
}
