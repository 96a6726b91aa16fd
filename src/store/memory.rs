// In-memory record store

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{item_key, RecordStore, StoreError, Table};
use crate::users::UserRecord;

/// Tables held in process memory; contents are lost on exit
pub struct MemoryStore {
    key_field: String,
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    /// Create a store with the given tables provisioned and empty
    pub fn new(key_field: &str, tables: &[&str]) -> Self {
        Self::with_tables(
            key_field,
            tables
                .iter()
                .map(|name| ((*name).to_string(), Table::new()))
                .collect(),
        )
    }

    /// Create a store from pre-loaded table contents
    pub fn with_tables(key_field: &str, tables: HashMap<String, Table>) -> Self {
        Self {
            key_field: key_field.to_string(),
            tables: RwLock::new(tables),
        }
    }

    /// Upsert `item`, then run `after` on the table while the write lock is held
    pub async fn put_with<R>(
        &self,
        table: &str,
        item: UserRecord,
        after: impl FnOnce(&Table) -> R + Send,
    ) -> Result<R, StoreError> {
        let key = item_key(&item, &self.key_field)?.to_string();
        let mut tables = self.tables.write().await;
        let records = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        records.insert(key, item);
        Ok(after(records))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, table: &str, key: &str) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.tables.read().await;
        let records = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(records.get(key).cloned())
    }

    async fn put(&self, table: &str, item: UserRecord) -> Result<(), StoreError> {
        self.put_with(table, item, |_| ()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::into_item;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new("UserId", &["Users"])
    }

    #[tokio::test]
    async fn test_get_missing_record() {
        let store = store();
        assert_eq!(store.get("Users", "nobody").await, Ok(None));
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = store();
        let item = into_item(json!({"UserId": "u1", "Height": 180, "Weight": 75})).unwrap();
        store.put("Users", item.clone()).await.unwrap();
        assert_eq!(store.get("Users", "u1").await, Ok(Some(item)));
    }

    #[tokio::test]
    async fn test_put_overwrites_whole_record() {
        let store = store();
        let first = into_item(json!({"UserId": "u1", "Height": 180, "Nickname": "x"})).unwrap();
        let second = into_item(json!({"UserId": "u1", "Weight": 80})).unwrap();
        store.put("Users", first).await.unwrap();
        store.put("Users", second.clone()).await.unwrap();
        let stored = store.get("Users", "u1").await.unwrap().unwrap();
        assert_eq!(stored, second);
        assert!(!stored.contains_key("Nickname"));
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let store = store();
        let err = store.get("Accounts", "u1").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Requested resource not found: Table: Accounts not found"
        );
    }

    #[tokio::test]
    async fn test_put_rejects_item_without_key() {
        let store = store();
        let item = into_item(json!({"Height": 180})).unwrap();
        assert_eq!(
            store.put("Users", item).await,
            Err(StoreError::MissingKey("UserId".to_string()))
        );
    }

    #[tokio::test]
    async fn test_put_with_sees_table_after_write() {
        let store = store();
        let a = into_item(json!({"UserId": "a"})).unwrap();
        let b = into_item(json!({"UserId": "b"})).unwrap();
        store.put("Users", a).await.unwrap();
        let keys = store
            .put_with("Users", b, |t| t.keys().cloned().collect::<Vec<_>>())
            .await
            .unwrap();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
