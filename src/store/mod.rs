//! Capability interface to the external record store.
//!
//! The reservation data (users, routes, bookings) lives in a hosted
//! relational store owned by the CRUD layer. The notification core only
//! needs four keyed operations over JSON records, so it depends on this
//! trait rather than any storage product. [`MemoryStore`] backs tests and
//! the CLI.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A stored record: a flat JSON object keyed by column name.
pub type Record = serde_json::Map<String, Value>;

/// Errors surfaced by a record store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the given key.
    #[error("record not found: {table}/{key}")]
    NotFound {
        /// Table the lookup ran against.
        table: String,
        /// Primary key that missed.
        key: String,
    },

    /// A record already exists under the given key.
    #[error("duplicate key: {table}/{key}")]
    Duplicate {
        /// Table the insert ran against.
        table: String,
        /// Primary key that collided.
        key: String,
    },

    /// The backend itself failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Keyed record store with equality filtering.
///
/// Implementations are shared behind `Arc` and called concurrently; all
/// methods take `&self`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record stored under `key`, or `None`.
    async fn get_by_key(&self, table: &str, key: &str) -> Result<Option<Record>, StoreError>;

    /// Insert a new record under `key`. Fails with [`StoreError::Duplicate`]
    /// if the key is taken.
    async fn insert(&self, table: &str, key: &str, record: Record) -> Result<(), StoreError>;

    /// Merge `patch` into the record under `key`, column by column.
    /// Explicit `null` values are stored (they clear a column, not the
    /// key). Fails with [`StoreError::NotFound`] for a missing record.
    async fn update_by_key(&self, table: &str, key: &str, patch: Record)
    -> Result<(), StoreError>;

    /// All records whose `field` column equals `value`.
    async fn filter_equals(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError>;
}
