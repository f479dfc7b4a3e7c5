// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product catalog queries.

use rusqlite::{Row, params, params_from_iter};
use wagent_core::WagentError;
use wagent_core::types::Product;

use crate::codec::{json_column, to_json};
use crate::database::{Database, map_tr_err};

const PRODUCT_COLUMNS: &str = "id, subscriber_id, title, description, price_cents, media, active";

/// Attributes of a catalog entry to create.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub subscriber_id: i64,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub media: Vec<String>,
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        subscriber_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        price_cents: row.get(4)?,
        media: json_column(row, 5)?,
        active: row.get(6)?,
    })
}

pub async fn insert_product(db: &Database, new: NewProduct) -> Result<Product, WagentError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO products (subscriber_id, title, description, price_cents, media)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     RETURNING {PRODUCT_COLUMNS}"
                ),
                params![
                    new.subscriber_id,
                    new.title,
                    new.description,
                    new.price_cents,
                    to_json(&new.media)?,
                ],
                product_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Toggle a product's visibility. Returns false if it does not exist.
pub async fn set_active(db: &Database, id: i64, active: bool) -> Result<bool, WagentError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE products SET active = ?1 WHERE id = ?2",
                params![active, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Active products of `subscriber_id` among `ids`, in id order.
///
/// Ids belonging to other subscribers, inactive or unknown are silently absent.
pub async fn active_products_by_ids(
    db: &Database,
    subscriber_id: i64,
    ids: &[i64],
) -> Result<Vec<Product>, WagentError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products
                 WHERE subscriber_id = ? AND active = 1 AND id IN ({placeholders})
                 ORDER BY id"
            ))?;
            let params = std::iter::once(subscriber_id).chain(ids);
            let rows = stmt.query_map(params_from_iter(params), product_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Up to `limit` active products of a subscriber, oldest first.
pub async fn active_catalog(
    db: &Database,
    subscriber_id: i64,
    limit: usize,
) -> Result<Vec<Product>, WagentError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products
                 WHERE subscriber_id = ?1 AND active = 1
                 ORDER BY id
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![subscriber_id, limit], product_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::accounts::insert_subscriber;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    fn product(subscriber_id: i64, title: &str, media: usize) -> NewProduct {
        NewProduct {
            subscriber_id,
            title: title.into(),
            description: format!("{title} description"),
            price_cents: 1990,
            media: (0..media).map(|i| format!("https://cdn.example.com/{title}-{i}.jpg")).collect(),
        }
    }

    #[tokio::test]
    async fn lookup_is_scoped_to_owner_and_active_rows() {
        let (db, _dir) = setup_db().await;
        let owner = insert_subscriber(&db, "owner", None).await.unwrap();
        let other = insert_subscriber(&db, "other", None).await.unwrap();

        let a = insert_product(&db, product(owner, "mug", 2)).await.unwrap();
        let b = insert_product(&db, product(owner, "cap", 0)).await.unwrap();
        let foreign = insert_product(&db, product(other, "hat", 1)).await.unwrap();
        assert_eq!(a.media.len(), 2);
        assert!(a.active);

        assert!(set_active(&db, b.id, false).await.unwrap());

        let found = active_products_by_ids(&db, owner, &[b.id, foreign.id, a.id, 9999])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0], a);

        assert!(active_products_by_ids(&db, owner, &[]).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn catalog_respects_limit() {
        let (db, _dir) = setup_db().await;
        let owner = insert_subscriber(&db, "owner", None).await.unwrap();
        for i in 0..5 {
            insert_product(&db, product(owner, &format!("p{i}"), 0))
                .await
                .unwrap();
        }
        let catalog = active_catalog(&db, owner, 3).await.unwrap();
        let titles: Vec<_> = catalog.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["p0", "p1", "p2"]);
        db.close().await.unwrap();
    }
}
