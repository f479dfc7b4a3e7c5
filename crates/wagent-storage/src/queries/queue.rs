// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable work queue for inbound messages and billing events.
//!
//! Entries move `pending -> processing -> completed`, or back to `pending`
//! on failure until `max_attempts` is reached. A `processing` entry whose
//! lock has expired (its worker died) is handed out again.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use wagent_core::WagentError;

use crate::database::{Database, map_tr_err};

/// Lock applied to a dequeued entry when the caller does not choose one.
pub const DEFAULT_LOCK_SECS: u64 = 300;

/// A row of the `queue` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}

/// Enqueue a new item. Returns the queue entry id.
pub async fn enqueue(db: &Database, queue_name: &str, payload: &str) -> Result<i64, WagentError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (queue_name, payload) VALUES (?1, ?2)",
                params![queue_name, payload],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Claim the oldest available entry of `queue_name`, locking it for `lock_secs`.
///
/// Available means pending, or processing with an expired lock.
pub async fn dequeue(
    db: &Database,
    queue_name: &str,
    lock_secs: u64,
) -> Result<Option<QueueEntry>, WagentError> {
    let queue_name = queue_name.to_string();
    let lock = format!("+{lock_secs} seconds");
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let entry = tx
                .query_row(
                    "SELECT id, queue_name, payload, status, attempts, max_attempts,
                            created_at, updated_at, locked_until
                     FROM queue
                     WHERE queue_name = ?1
                       AND (status = 'pending'
                            OR (status = 'processing'
                                AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))
                     ORDER BY id ASC
                     LIMIT 1",
                    params![queue_name],
                    |row| {
                        Ok(QueueEntry {
                            id: row.get(0)?,
                            queue_name: row.get(1)?,
                            payload: row.get(2)?,
                            status: row.get(3)?,
                            attempts: row.get(4)?,
                            max_attempts: row.get(5)?,
                            created_at: row.get(6)?,
                            updated_at: row.get(7)?,
                            locked_until: row.get(8)?,
                        })
                    },
                )
                .optional()?;

            let Some(entry) = entry else {
                tx.commit()?;
                return Ok(None);
            };

            let (locked_until, updated_at): (String, String) = tx.query_row(
                "UPDATE queue SET status = 'processing',
                 locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2
                 RETURNING locked_until, updated_at",
                params![lock, entry.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            tx.commit()?;

            Ok(Some(QueueEntry {
                status: "processing".to_string(),
                locked_until: Some(locked_until),
                updated_at,
                ..entry
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry completed.
pub async fn ack(db: &Database, id: i64) -> Result<(), WagentError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'completed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt.
///
/// Returns the entry to `pending` for another try, or marks it `failed`
/// once `max_attempts` is reached. Returns true if the entry is now dead.
pub async fn fail(db: &Database, id: i64) -> Result<bool, WagentError> {
    db.connection()
        .call(move |conn| {
            let status: String = conn.query_row(
                "UPDATE queue SET attempts = attempts + 1,
                 status = CASE WHEN attempts + 1 >= max_attempts THEN 'failed' ELSE 'pending' END,
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1
                 RETURNING status",
                params![id],
                |row| row.get(0),
            )?;
            Ok(status == "failed")
        })
        .await
        .map_err(map_tr_err)
}

/// Number of entries of `queue_name` still waiting or in flight.
pub async fn backlog(db: &Database, queue_name: &str) -> Result<i64, WagentError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM queue
                 WHERE queue_name = ?1 AND status IN ('pending', 'processing')",
                params![queue_name],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn status_of(db: &Database, id: i64) -> (String, i32) {
        db.connection()
            .call(move |conn| -> Result<(String, i32), rusqlite::Error> {
                conn.query_row(
                    "SELECT status, attempts FROM queue WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn enqueue_dequeue_ack_lifecycle() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "inbound", r#"{"messageId":"m1"}"#).await.unwrap();
        assert_eq!(backlog(&db, "inbound").await.unwrap(), 1);

        let entry = dequeue(&db, "inbound", DEFAULT_LOCK_SECS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.status, "processing");
        assert!(entry.locked_until.is_some());
        assert_eq!(entry.payload, r#"{"messageId":"m1"}"#);

        assert!(dequeue(&db, "inbound", DEFAULT_LOCK_SECS).await.unwrap().is_none());
        assert!(dequeue(&db, "billing", DEFAULT_LOCK_SECS).await.unwrap().is_none());

        ack(&db, id).await.unwrap();
        assert_eq!(status_of(&db, id).await.0, "completed");
        assert_eq!(backlog(&db, "inbound").await.unwrap(), 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failures_retry_until_max_attempts() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "billing", "payload").await.unwrap();

        for attempt in 1..=3 {
            dequeue(&db, "billing", DEFAULT_LOCK_SECS)
                .await
                .unwrap()
                .unwrap();
            let dead = fail(&db, id).await.unwrap();
            assert_eq!(dead, attempt == 3);
            let (status, attempts) = status_of(&db, id).await;
            assert_eq!(attempts, attempt);
            assert_eq!(status, if attempt == 3 { "failed" } else { "pending" });
        }
        assert!(dequeue(&db, "billing", DEFAULT_LOCK_SECS).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_lock_is_reclaimed() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "inbound", "p").await.unwrap();
        dequeue(&db, "inbound", DEFAULT_LOCK_SECS).await.unwrap().unwrap();

        // Simulate a worker that died holding the lock.
        db.connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "UPDATE queue SET locked_until = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![id],
                )
            })
            .await
            .unwrap();

        let again = dequeue(&db, "inbound", DEFAULT_LOCK_SECS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.id, id);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_enqueues_all_land() {
        let (db, _dir) = setup_db().await;

        let mut handles = Vec::new();
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                enqueue(&db, "inbound", &format!(r#"{{"n":{i}}}"#)).await
            }));
        }
        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok(), "concurrent enqueue failed: {result:?}");
        }
        assert_eq!(backlog(&db, "inbound").await.unwrap(), 10);

        db.close().await.unwrap();
    }
}
