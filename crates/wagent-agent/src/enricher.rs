// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product enricher: resolves requested ids into attachable catalog entries.

use std::sync::Arc;

use tracing::{debug, warn};
use wagent_core::CatalogStore;
use wagent_core::types::{Product, ProductData};

pub struct ProductEnricher {
    catalog: Arc<dyn CatalogStore>,
    excerpt_limit: usize,
    reply_limit: usize,
}

impl ProductEnricher {
    pub fn new(catalog: Arc<dyn CatalogStore>, excerpt_limit: usize, reply_limit: usize) -> Self {
        Self {
            catalog,
            excerpt_limit,
            reply_limit,
        }
    }

    /// Active products of `subscriber_id` among `ids`, in the requested order.
    ///
    /// Ids that are unknown, inactive or owned by someone else are dropped.
    /// A catalog failure yields no products.
    pub async fn enrich(&self, subscriber_id: i64, ids: &[i64]) -> Vec<ProductData> {
        if ids.is_empty() {
            return Vec::new();
        }
        let found = match self.catalog.active_products_by_ids(subscriber_id, ids).await {
            Ok(found) => found,
            Err(e) => {
                warn!(subscriber_id, error = %e, "product lookup failed, replying without products");
                return Vec::new();
            }
        };

        let products: Vec<ProductData> = ids
            .iter()
            .filter_map(|id| found.iter().find(|p| p.id == *id && p.active))
            .cloned()
            .map(ProductData::from)
            .collect();

        if products.len() < ids.len() {
            debug!(
                subscriber_id,
                requested = ids.len(),
                resolved = products.len(),
                "unresolved product ids dropped"
            );
        }
        products
    }

    /// Catalog attached to a SHOW_CATALOG reply.
    pub async fn catalog(&self, subscriber_id: i64) -> Vec<ProductData> {
        match self.catalog.active_catalog(subscriber_id, self.reply_limit).await {
            Ok(products) => products.into_iter().map(ProductData::from).collect(),
            Err(e) => {
                warn!(subscriber_id, error = %e, "catalog lookup failed, replying without products");
                Vec::new()
            }
        }
    }

    /// Products listed in the system prompt.
    pub async fn excerpt(&self, subscriber_id: i64) -> Vec<Product> {
        match self.catalog.active_catalog(subscriber_id, self.excerpt_limit).await {
            Ok(products) => products,
            Err(e) => {
                warn!(subscriber_id, error = %e, "catalog excerpt unavailable");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wagent_core::WagentError;

    struct FixedCatalog {
        products: Vec<Product>,
        broken: bool,
    }

    fn product(id: i64, subscriber_id: i64, active: bool) -> Product {
        Product {
            id,
            subscriber_id,
            title: format!("Produto {id}"),
            description: String::new(),
            price_cents: 1990,
            media: vec![format!("https://cdn.example.com/{id}.jpg")],
            active,
        }
    }

    #[async_trait]
    impl CatalogStore for FixedCatalog {
        async fn active_products_by_ids(
            &self,
            subscriber_id: i64,
            ids: &[i64],
        ) -> Result<Vec<Product>, WagentError> {
            if self.broken {
                return Err(WagentError::Internal("catalog offline".into()));
            }
            let mut found: Vec<Product> = self
                .products
                .iter()
                .filter(|p| p.subscriber_id == subscriber_id && p.active && ids.contains(&p.id))
                .cloned()
                .collect();
            found.sort_by_key(|p| p.id);
            Ok(found)
        }

        async fn active_catalog(
            &self,
            subscriber_id: i64,
            limit: usize,
        ) -> Result<Vec<Product>, WagentError> {
            if self.broken {
                return Err(WagentError::Internal("catalog offline".into()));
            }
            Ok(self
                .products
                .iter()
                .filter(|p| p.subscriber_id == subscriber_id && p.active)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    fn enricher(broken: bool) -> ProductEnricher {
        let catalog = FixedCatalog {
            products: vec![
                product(1, 1, true),
                product(2, 1, false),
                product(3, 1, true),
                product(4, 2, true),
                product(5, 1, true),
            ],
            broken,
        };
        ProductEnricher::new(Arc::new(catalog), 25, 2)
    }

    #[tokio::test]
    async fn keeps_requested_order_and_drops_misses() {
        let products = enricher(false).enrich(1, &[5, 2, 4, 99, 1]).await;
        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 1]);
        assert_eq!(products[0].media.len(), 1);
    }

    #[tokio::test]
    async fn catalog_reply_is_limited() {
        let products = enricher(false).catalog(1).await;
        assert_eq!(products.len(), 2);
    }

    #[tokio::test]
    async fn failures_degrade_to_no_products() {
        let e = enricher(true);
        assert!(e.enrich(1, &[1]).await.is_empty());
        assert!(e.catalog(1).await.is_empty());
        assert!(e.excerpt(1).await.is_empty());
    }
}
