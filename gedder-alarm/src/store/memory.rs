use async_trait::async_trait;
use parking_lot::RwLock;

use super::{AlarmStore, StoreError};
use crate::record::{AlarmId, AlarmRecord};

/// In-process store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<AlarmRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = AlarmRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }
}

#[async_trait]
impl AlarmStore for MemoryStore {
    async fn create(&self, record: AlarmRecord) -> Result<AlarmRecord, StoreError> {
        let mut records = self.records.write();
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: AlarmId) -> Result<AlarmRecord, StoreError> {
        self.records
            .read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn get_all(&self) -> Result<Vec<AlarmRecord>, StoreError> {
        Ok(self.records.read().clone())
    }

    async fn update(&self, record: &AlarmRecord) -> Result<usize, StoreError> {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: AlarmId) -> Result<usize, StoreError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn record() -> AlarmRecord {
        AlarmRecord::with_defaults(datetime!(2026-03-02 09:00 UTC)).unwrap()
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = MemoryStore::new();
        let created = store.create(record()).await.unwrap();
        assert_eq!(store.get(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemoryStore::new();
        let r = record();
        store.create(r.clone()).await.unwrap();
        assert!(matches!(
            store.create(r).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let store = MemoryStore::new();
        let id = AlarmId::new();
        assert!(matches!(store.get(id).await, Err(StoreError::NotFound(found)) if found == id));
    }

    #[tokio::test]
    async fn update_and_delete_report_affected_count() {
        let store = MemoryStore::new();
        let mut r = store.create(record()).await.unwrap();

        r.alarm_armed = true;
        assert_eq!(store.update(&r).await.unwrap(), 1);
        assert!(store.get(r.id).await.unwrap().alarm_armed);

        let stranger = record();
        assert_eq!(store.update(&stranger).await.unwrap(), 0);

        assert_eq!(store.delete(r.id).await.unwrap(), 1);
        assert_eq!(store.delete(r.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn get_all_keeps_creation_order() {
        let store = MemoryStore::new();
        let first = store.create(record()).await.unwrap();
        let second = store.create(record()).await.unwrap();

        let ids: Vec<_> = store.get_all().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
