//! Record store module
//!
//! Key-value persistence behind the user router. Each table maps the value of
//! the configured key field (`UserId` by default) to a whole record; `put` is
//! an unconditional upsert.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};
use crate::users::UserRecord;

/// Records of one table, keyed by their key-field value
pub type Table = BTreeMap<String, UserRecord>;

/// Failures raised by a store; the `Display` text is surfaced to clients
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Requested resource not found: Table: {0} not found")]
    TableNotFound(String),

    #[error("Item must be a JSON object")]
    NotAnObject,

    #[error("One or more parameter values were invalid: Missing the key {0} in the item")]
    MissingKey(String),

    #[error("One or more parameter values were invalid: Type mismatch for key {key} expected: S actual: {actual}")]
    KeyTypeMismatch { key: String, actual: &'static str },

    #[error("One or more parameter values are not valid. The AttributeValue for a key attribute cannot contain an empty string value. Key: {0}")]
    EmptyKey(String),

    #[error("{0}")]
    Backend(String),
}

/// Minimal get/put capability over named tables
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record stored under `key`, `None` if absent
    async fn get(&self, table: &str, key: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert or overwrite `item` under its own key-field value
    async fn put(&self, table: &str, item: UserRecord) -> Result<(), StoreError>;
}

/// Shared store handle injected into the router
pub type SharedStore = Arc<dyn RecordStore>;

/// Turn a parsed request body into a storable item
pub fn into_item(value: Value) -> Result<UserRecord, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

/// Extract the key-field value of `item`
///
/// Keys must be non-empty strings.
pub fn item_key<'a>(item: &'a UserRecord, key_field: &str) -> Result<&'a str, StoreError> {
    match item.get(key_field) {
        None => Err(StoreError::MissingKey(key_field.to_string())),
        Some(Value::String(s)) if s.is_empty() => Err(StoreError::EmptyKey(key_field.to_string())),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(StoreError::KeyTypeMismatch {
            key: key_field.to_string(),
            actual: type_code(other),
        }),
    }
}

/// Short type code for a JSON value, as used in key mismatch messages
const fn type_code(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Bool(_) => "BOOL",
        Value::Number(_) => "N",
        Value::String(_) => "S",
        Value::Array(_) => "L",
        Value::Object(_) => "M",
    }
}

/// Build the configured backend with its table provisioned
pub fn from_config(config: &StoreConfig) -> Result<SharedStore, StoreError> {
    let tables = [config.table.as_str()];
    let store: SharedStore = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new(&config.key_field, &tables)),
        StoreBackend::File => Arc::new(FileStore::open(
            &config.data_dir,
            &config.key_field,
            &tables,
        )?),
    };
    crate::logger::log_store_ready(config);
    Ok(store)
}
