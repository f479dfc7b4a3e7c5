// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscriber and account records.

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use wagent_core::WagentError;
use wagent_core::types::{Account, AccountStatus, AiSettings};

use crate::codec::{enum_column, format_ts, json_column, to_json, ts_column};
use crate::database::{Database, map_tr_err};

/// Attributes of an account created when a messaging session connects.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub subscriber_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub ai: AiSettings,
}

const ACCOUNT_COLUMNS: &str = "id, subscriber_id, name, phone, status, ai_settings, created_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        subscriber_id: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        status: enum_column(row, 4)?,
        ai: json_column(row, 5)?,
        created_at: ts_column(row, 6)?,
    })
}

/// Create a subscriber. Returns its id.
pub async fn insert_subscriber(
    db: &Database,
    name: &str,
    email: Option<&str>,
) -> Result<i64, WagentError> {
    let name = name.to_string();
    let email = email.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO subscribers (name, email) VALUES (?1, ?2)",
                params![name, email],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_account(db: &Database, new: NewAccount) -> Result<Account, WagentError> {
    db.connection()
        .call(move |conn| {
            let ai = to_json(&new.ai)?;
            let now = format_ts(Utc::now());
            conn.query_row(
                &format!(
                    "INSERT INTO accounts (subscriber_id, name, phone, ai_settings, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                     RETURNING {ACCOUNT_COLUMNS}"
                ),
                params![new.subscriber_id, new.name, new.phone, ai, now],
                account_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_account(db: &Database, id: i64) -> Result<Option<Account>, WagentError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id],
                account_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the AI persona configuration. Returns false if the account does not exist.
pub async fn update_ai_settings(
    db: &Database,
    id: i64,
    ai: &AiSettings,
) -> Result<bool, WagentError> {
    let ai = ai.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE accounts SET ai_settings = ?1, updated_at = ?2 WHERE id = ?3",
                params![to_json(&ai)?, format_ts(Utc::now()), id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_status(
    db: &Database,
    id: i64,
    status: AccountStatus,
) -> Result<bool, WagentError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE accounts SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.to_string(), format_ts(Utc::now()), id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wagent_core::types::ReplyTiming;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn account_round_trips_ai_settings() {
        let (db, _dir) = setup_db().await;
        let subscriber = insert_subscriber(&db, "Loja Azul", Some("owner@example.com"))
            .await
            .unwrap();
        let ai = AiSettings {
            system_prompt: Some("You sell blue shoes.".into()),
            trigger_words: vec!["shoe".into()],
            timing: ReplyTiming::Fixed { seconds: 12 },
            ..AiSettings::default()
        };
        let account = insert_account(
            &db,
            NewAccount {
                subscriber_id: subscriber,
                name: "Main number".into(),
                phone: Some("+5511999990000".into()),
                ai: ai.clone(),
            },
        )
        .await
        .unwrap();

        let loaded = get_account(&db, account.id).await.unwrap().unwrap();
        assert_eq!(loaded.subscriber_id, subscriber);
        assert_eq!(loaded.status, AccountStatus::Connected);
        assert_eq!(loaded.ai, ai);
        assert_eq!(loaded, account);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn updates_and_missing_accounts() {
        let (db, _dir) = setup_db().await;
        assert!(get_account(&db, 42).await.unwrap().is_none());
        assert!(!set_status(&db, 42, AccountStatus::Disconnected).await.unwrap());

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

        let disabled = AiSettings {
            enabled: false,
            ..AiSettings::default()
        };
        assert!(update_ai_settings(&db, account.id, &disabled).await.unwrap());
        assert!(set_status(&db, account.id, AccountStatus::Disconnected).await.unwrap());
        let loaded = get_account(&db, account.id).await.unwrap().unwrap();
        assert!(!loaded.ai.enabled);
        assert_eq!(loaded.status, AccountStatus::Disconnected);

        db.close().await.unwrap();
    }
}
