//! In-memory record store for tests and the CLI.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::{Record, RecordStore, StoreError};

/// Record store backed by per-table `BTreeMap`s, so filter results come
/// back in key order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, BTreeMap<String, Record>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_by_key(&self, table: &str, key: &str) -> Result<Option<Record>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables.get(table).and_then(|t| t.get(key)).cloned())
    }

    async fn insert(&self, table: &str, key: &str, record: Record) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let table_map = tables.entry(table.to_string()).or_default();
        if table_map.contains_key(key) {
            return Err(StoreError::Duplicate {
                table: table.to_string(),
                key: key.to_string(),
            });
        }
        table_map.insert(key.to_string(), record);
        Ok(())
    }

    async fn update_by_key(
        &self,
        table: &str,
        key: &str,
        patch: Record,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let record = tables
            .get_mut(table)
            .and_then(|t| t.get_mut(key))
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                key: key.to_string(),
            })?;
        for (column, value) in patch {
            record.insert(column, value);
        }
        Ok(())
    }

    async fn filter_equals(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .get(table)
            .map(|t| {
                t.values()
                    .filter(|record| record.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
