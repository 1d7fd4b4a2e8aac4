//! Durable alarm-record storage.
//!
//! The store is the single source of truth for alarm state. It is plain
//! key-addressed storage with no transactions: callers read the latest
//! record, mutate their copy, and write it back. Two writers racing on the
//! same record resolve as last-write-wins.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::record::{AlarmId, AlarmRecord};

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Alarm {0} not found")]
    NotFound(AlarmId),

    #[error("Alarm {0} already exists")]
    Duplicate(AlarmId),

    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store contents are corrupt: {0}")]
    Corrupt(String),
}

/// Alarm Record Store capability.
#[async_trait]
pub trait AlarmStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::Duplicate`] if the id
    /// is already present.
    async fn create(&self, record: AlarmRecord) -> std::result::Result<AlarmRecord, StoreError>;

    async fn get(&self, id: AlarmId) -> std::result::Result<AlarmRecord, StoreError>;

    /// All records, in creation order.
    async fn get_all(&self) -> std::result::Result<Vec<AlarmRecord>, StoreError>;

    /// Overwrite the record with the same id. Returns the number of records
    /// changed: 0 when the id is unknown, otherwise 1.
    async fn update(&self, record: &AlarmRecord) -> std::result::Result<usize, StoreError>;

    /// Returns the number of records removed (0 or 1).
    async fn delete(&self, id: AlarmId) -> std::result::Result<usize, StoreError>;
}
