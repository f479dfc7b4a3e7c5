// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage and catalog traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use wagent_config::model::StorageConfig;
use wagent_core::types::{Account, Conversation, Message, NewConversation, NewMessage, Product};
use wagent_core::{
    AdapterType, CatalogStore, HealthStatus, PluginAdapter, StorageAdapter, WagentError,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened on [`StorageAdapter::initialize`]; every other call
/// fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already open database.
    pub fn with_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// The underlying database, shared with the billing ledger and the queue.
    pub fn database(&self) -> Result<&Database, WagentError> {
        self.db.get().ok_or_else(|| WagentError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), WagentError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, WagentError> {
        let db = self.database()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WagentError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), WagentError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| WagentError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), WagentError> {
        Self::checkpoint(self.database()?).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn get_account(&self, account_id: i64) -> Result<Option<Account>, WagentError> {
        queries::accounts::get_account(self.database()?, account_id).await
    }

    async fn find_or_create_conversation(
        &self,
        account_id: i64,
        new: NewConversation,
    ) -> Result<Conversation, WagentError> {
        queries::conversations::find_or_create(self.database()?, account_id, new).await
    }

    async fn append_message(&self, message: NewMessage) -> Result<Option<Message>, WagentError> {
        queries::messages::append_message(self.database()?, message).await
    }

    async fn recent_messages(
        &self,
        conversation_id: i64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Message>, WagentError> {
        queries::messages::recent_messages(self.database()?, conversation_id, since, limit).await
    }
}

#[async_trait]
impl CatalogStore for SqliteStorage {
    async fn active_products_by_ids(
        &self,
        subscriber_id: i64,
        ids: &[i64],
    ) -> Result<Vec<Product>, WagentError> {
        queries::products::active_products_by_ids(self.database()?, subscriber_id, ids).await
    }

    async fn active_catalog(
        &self,
        subscriber_id: i64,
        limit: usize,
    ) -> Result<Vec<Product>, WagentError> {
        queries::products::active_catalog(self.database()?, subscriber_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::accounts::{NewAccount, insert_account, insert_subscriber};
    use crate::queries::products::{NewProduct, insert_product};
    use tempfile::tempdir;
    use wagent_core::types::{AiSettings, Direction, InboundMessage, MessageType};

    fn make_config(path: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: path.to_str().unwrap().to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn adapter_metadata() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("test.db")));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn calls_fail_before_initialize_and_twice_initialize_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("init.db");
        let storage = SqliteStorage::new(make_config(&path));

        assert!(storage.health_check().await.is_err());
        assert!(storage.get_account(1).await.is_err());

        storage.initialize().await.unwrap();
        assert!(path.exists());
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        assert!(storage.initialize().await.is_err());
        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn conversation_flow_through_adapter() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(&dir.path().join("flow.db")));
        storage.initialize().await.unwrap();
        let db = storage.database().unwrap();

        let subscriber = insert_subscriber(db, "shop", None).await.unwrap();
        let account = insert_account(
            db,
            NewAccount {
                subscriber_id: subscriber,
                name: "main".into(),
                phone: None,
                ai: AiSettings::default(),
            },
        )
        .await
        .unwrap();
        let mug = insert_product(
            db,
            NewProduct {
                subscriber_id: subscriber,
                title: "Mug".into(),
                description: "Ceramic".into(),
                price_cents: 1500,
                media: vec![],
            },
        )
        .await
        .unwrap();

        let loaded = storage.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, account.id);

        let conv = storage
            .find_or_create_conversation(
                account.id,
                NewConversation {
                    external_chat_id: "5511@c.us".into(),
                    contact_name: Some("Ana".into()),
                    ..NewConversation::default()
                },
            )
            .await
            .unwrap();

        let inbound = InboundMessage {
            message_id: "wamid-1".into(),
            account_id: account.id,
            sender_id: "5511@c.us".into(),
            body: "do you have mugs?".into(),
            timestamp: Utc::now(),
            message_type: MessageType::Text,
            is_group: false,
            chat_name: None,
            metadata: None,
        };
        let stored = storage
            .append_message(NewMessage::inbound(conv.id, &inbound))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.direction, Direction::Inbound);
        assert_eq!(stored.external_id.as_deref(), Some("wamid-1"));

        let history = storage
            .recent_messages(conv.id, Utc::now() - chrono::Duration::hours(1), 10)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);

        let products = storage
            .active_products_by_ids(subscriber, &[mug.id])
            .await
            .unwrap();
        assert_eq!(products, vec![mug.clone()]);
        assert_eq!(storage.active_catalog(subscriber, 10).await.unwrap(), vec![mug]);

        storage.close().await.unwrap();
    }
}
