// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

use crate::error::WagentError;
use crate::types::Product;

/// Read-only access to subscriber product catalogs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Active products of `subscriber_id` among `ids`. Unknown ids are absent from the result.
    async fn active_products_by_ids(
        &self,
        subscriber_id: i64,
        ids: &[i64],
    ) -> Result<Vec<Product>, WagentError>;

    /// Up to `limit` active products of `subscriber_id`, by id.
    async fn active_catalog(
        &self,
        subscriber_id: i64,
        limit: usize,
    ) -> Result<Vec<Product>, WagentError>;
}
