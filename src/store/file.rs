// File-backed record store
// Keeps tables in memory and rewrites <data_dir>/<table>.json after every put

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{MemoryStore, RecordStore, StoreError, Table};
use crate::logger;
use crate::users::UserRecord;

/// Write-through JSON file store
pub struct FileStore {
    data_dir: PathBuf,
    records: MemoryStore,
    /// Serializes put + file rewrite so snapshots land in write order
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (or create) the data directory and load each table file
    ///
    /// A missing table file means an empty table; an unreadable or
    /// unparsable one fails start-up rather than discarding records.
    pub fn open(data_dir: &str, key_field: &str, tables: &[&str]) -> Result<Self, StoreError> {
        let data_dir = PathBuf::from(data_dir);
        fs::create_dir_all(&data_dir).map_err(|e| {
            StoreError::Backend(format!(
                "Failed to create data directory {}: {e}",
                data_dir.display()
            ))
        })?;

        let mut loaded = HashMap::new();
        for name in tables {
            let path = table_path(&data_dir, name);
            let table = load_table(&path)?;
            logger::log_info(&format!(
                "[Store] Loaded {} record(s) for table {name} from {}",
                table.len(),
                path.display()
            ));
            loaded.insert((*name).to_string(), table);
        }

        Ok(Self {
            data_dir,
            records: MemoryStore::with_tables(key_field, loaded),
            write_lock: Mutex::new(()),
        })
    }
}

fn table_path(data_dir: &Path, table: &str) -> PathBuf {
    data_dir.join(format!("{table}.json"))
}

fn load_table(path: &Path) -> Result<Table, StoreError> {
    if !path.exists() {
        return Ok(Table::new());
    }
    let content = fs::read_to_string(path).map_err(|e| {
        StoreError::Backend(format!("Failed to read table file {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        StoreError::Backend(format!("Failed to parse table file {}: {e}", path.display()))
    })
}

#[async_trait]
impl RecordStore for FileStore {
    async fn get(&self, table: &str, key: &str) -> Result<Option<UserRecord>, StoreError> {
        self.records.get(table, key).await
    }

    async fn put(&self, table: &str, item: UserRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        // Memory is updated even if the rewrite below fails; the next
        // successful put writes the full table again.
        let content = self
            .records
            .put_with(table, item, |t: &Table| serde_json::to_string_pretty(t))
            .await?
            .map_err(|e| StoreError::Backend(format!("Failed to serialize table {table}: {e}")))?;

        let path = table_path(&self.data_dir, table);
        tokio::fs::write(&path, content).await.map_err(|e| {
            StoreError::Backend(format!(
                "Failed to write table file {}: {e}",
                path.display()
            ))
        })
    }
}
