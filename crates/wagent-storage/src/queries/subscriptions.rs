// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription records and cycle resolution.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::info;
use wagent_core::WagentError;
use wagent_core::billing::{Subscription, SubscriptionStatus};

use crate::codec::{enum_column, format_ts, ts_column};
use crate::database::{Database, map_tr_err};

pub const SUBSCRIPTION_COLUMNS: &str = "id, subscriber_id, package_name, messages_limit, \
     products_limit, accounts_limit, starts_at, ends_at, status";

/// Attributes of a package grant.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub subscriber_id: i64,
    pub package_name: String,
    pub messages_limit: i64,
    pub products_limit: Option<i64>,
    pub accounts_limit: Option<i64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

pub fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        id: row.get(0)?,
        subscriber_id: row.get(1)?,
        package_name: row.get(2)?,
        messages_limit: row.get(3)?,
        products_limit: row.get(4)?,
        accounts_limit: row.get(5)?,
        starts_at: ts_column(row, 6)?,
        ends_at: ts_column(row, 7)?,
        status: enum_column(row, 8)?,
    })
}

/// The subscription that governs `subscriber_id` at `now`, if any.
///
/// The window decides: a grant the expiry sweep already marked `expired` still
/// governs instants inside its window, so events queued before the sweep are
/// judged as of when they happened. Among overlapping grants the one that
/// started last wins.
pub fn current_subscription_sync(
    conn: &rusqlite::Connection,
    subscriber_id: i64,
    now: &str,
) -> rusqlite::Result<Option<Subscription>> {
    conn.query_row(
        &format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
             WHERE subscriber_id = ?1 AND status IN ('active', 'expired')
               AND starts_at <= ?2 AND ends_at > ?2
             ORDER BY starts_at DESC, id DESC
             LIMIT 1"
        ),
        params![subscriber_id, now],
        subscription_from_row,
    )
    .optional()
}

pub async fn insert_subscription(
    db: &Database,
    new: NewSubscription,
) -> Result<Subscription, WagentError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO subscriptions (subscriber_id, package_name, messages_limit,
                         products_limit, accounts_limit, starts_at, ends_at, status)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     RETURNING {SUBSCRIPTION_COLUMNS}"
                ),
                params![
                    new.subscriber_id,
                    new.package_name,
                    new.messages_limit,
                    new.products_limit,
                    new.accounts_limit,
                    format_ts(new.starts_at),
                    format_ts(new.ends_at),
                    SubscriptionStatus::Active.to_string(),
                ],
                subscription_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn current_subscription(
    db: &Database,
    subscriber_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<Subscription>, WagentError> {
    let now = format_ts(now);
    db.connection()
        .call(move |conn| current_subscription_sync(conn, subscriber_id, &now))
        .await
        .map_err(map_tr_err)
}

pub async fn set_subscription_status(
    db: &Database,
    id: i64,
    status: SubscriptionStatus,
) -> Result<bool, WagentError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE subscriptions SET status = ?1 WHERE id = ?2",
                params![status.to_string(), id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark active subscriptions whose window has closed as expired. Returns how many changed.
pub async fn expire_subscriptions(db: &Database, now: DateTime<Utc>) -> Result<usize, WagentError> {
    let now = format_ts(now);
    let expired = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE subscriptions SET status = 'expired'
                 WHERE status = 'active' AND ends_at <= ?1",
                params![now],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if expired > 0 {
        info!(expired, "subscriptions expired");
    }
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::accounts::insert_subscriber;
    use chrono::Duration;
    use tempfile::tempdir;

    async fn setup() -> (Database, i64, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        let subscriber = insert_subscriber(&db, "s", None).await.unwrap();
        (db, subscriber, dir)
    }

    fn grant(subscriber_id: i64, name: &str, start: DateTime<Utc>, days: i64) -> NewSubscription {
        NewSubscription {
            subscriber_id,
            package_name: name.into(),
            messages_limit: 1000,
            products_limit: Some(50),
            accounts_limit: None,
            starts_at: start,
            ends_at: start + Duration::days(days),
        }
    }

    #[tokio::test]
    async fn current_prefers_latest_started_active_grant() {
        let (db, subscriber, _dir) = setup().await;
        let now = Utc::now();
        assert!(current_subscription(&db, subscriber, now).await.unwrap().is_none());

        insert_subscription(&db, grant(subscriber, "basic", now - Duration::days(10), 30))
            .await
            .unwrap();
        let pro = insert_subscription(&db, grant(subscriber, "pro", now - Duration::days(1), 30))
            .await
            .unwrap();
        insert_subscription(&db, grant(subscriber, "future", now + Duration::days(5), 30))
            .await
            .unwrap();

        let current = current_subscription(&db, subscriber, now).await.unwrap().unwrap();
        assert_eq!(current, pro);
        assert!(current.is_current(now));

        set_subscription_status(&db, pro.id, SubscriptionStatus::Cancelled)
            .await
            .unwrap();
        let current = current_subscription(&db, subscriber, now).await.unwrap().unwrap();
        assert_eq!(current.package_name, "basic");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expire_marks_closed_windows() {
        let (db, subscriber, _dir) = setup().await;
        let now = Utc::now();
        let old = insert_subscription(&db, grant(subscriber, "old", now - Duration::days(40), 30))
            .await
            .unwrap();
        insert_subscription(&db, grant(subscriber, "live", now - Duration::days(1), 30))
            .await
            .unwrap();

        assert_eq!(expire_subscriptions(&db, now).await.unwrap(), 1);
        assert_eq!(expire_subscriptions(&db, now).await.unwrap(), 0);

        let status: String = db
            .connection()
            .call(move |conn| -> Result<String, rusqlite::Error> {
                conn.query_row(
                    "SELECT status FROM subscriptions WHERE id = ?1",
                    params![old.id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(status, "expired");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_grant_still_governs_its_own_window() {
        let (db, subscriber, _dir) = setup().await;
        let now = Utc::now();
        let start = now - Duration::days(30);
        let sub = insert_subscription(&db, grant(subscriber, "basic", start, 30))
            .await
            .unwrap();
        assert_eq!(expire_subscriptions(&db, now).await.unwrap(), 1);

        let inside = start + Duration::days(29);
        let resolved = current_subscription(&db, subscriber, inside)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, sub.id);
        assert_eq!(resolved.status, SubscriptionStatus::Expired);
        assert!(current_subscription(&db, subscriber, now).await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
