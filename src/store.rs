//! The four storage primitives the handler is allowed to use.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::dynamodb::{DynamoDb, Item, Table};
use crate::error::StoreError;

/// Storage collaborator behind the CRUD handler.
///
/// Implementations must be shareable across requests; the handler holds one
/// for the life of the process and never caches what it returns.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Item>, StoreError>;

    /// Returns every item in the collection, in no particular order.
    async fn scan_all(&self) -> Result<Vec<Item>, StoreError>;

    /// Upserts by `id`, replacing the whole stored document.
    async fn put(&self, item: &Item) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Items table in DynamoDB.
#[derive(Debug, Clone)]
pub struct DynamoStore {
    ddb: DynamoDb,
    table: Table,
}

impl DynamoStore {
    pub fn new(ddb: DynamoDb, table: Table) -> Self {
        Self { ddb, table }
    }
}

#[async_trait]
impl ItemStore for DynamoStore {
    async fn get(&self, key: &str) -> Result<Option<Item>, StoreError> {
        self.ddb.get_item(&self.table, key).await
    }

    async fn scan_all(&self) -> Result<Vec<Item>, StoreError> {
        self.ddb.scan_table(&self.table).await
    }

    async fn put(&self, item: &Item) -> Result<(), StoreError> {
        if item.id().is_none() {
            return Err(StoreError::MissingKey);
        }
        self.ddb.put_item(&self.table, item).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.ddb.delete_item(&self.table, key).await
    }
}

/// Process-local store for development and tests. Scans return items ordered
/// by key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<BTreeMap<String, Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Item>, StoreError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn scan_all(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn put(&self, item: &Item) -> Result<(), StoreError> {
        let key = item.id().ok_or(StoreError::MissingKey)?.to_string();
        self.items.write().await.insert(key, item.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.items.write().await.remove(key);
        Ok(())
    }
}
