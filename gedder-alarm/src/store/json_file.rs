//! File-backed store.
//!
//! The whole record set lives in one versioned JSON document. Reads are
//! served from memory; every mutation rewrites the document through a
//! temporary sibling file that is renamed over the original, so a crash
//! mid-write leaves the previous contents intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{AlarmStore, StoreError};
use crate::record::{AlarmId, AlarmRecord};
use crate::tracing::prelude::*;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    alarms: Vec<AlarmRecord>,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<Vec<AlarmRecord>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => decode(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Store file absent, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), alarms = records.len(), "Alarm store opened");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &[AlarmRecord]) -> Result<(), StoreError> {
        let document = Document {
            version: FORMAT_VERSION,
            alarms: records.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        trace!(path = %self.path.display(), alarms = records.len(), "Store persisted");
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<Vec<AlarmRecord>, StoreError> {
    let document: Document =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    if document.version != FORMAT_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported format version {}",
            document.version
        )));
    }
    Ok(document.alarms)
}

#[async_trait]
impl AlarmStore for JsonFileStore {
    async fn create(&self, record: AlarmRecord) -> Result<AlarmRecord, StoreError> {
        let mut records = self.records.lock().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Duplicate(record.id));
        }

        let mut next = records.clone();
        next.push(record.clone());
        self.persist(&next).await?;
        *records = next;
        Ok(record)
    }

    async fn get(&self, id: AlarmId) -> Result<AlarmRecord, StoreError> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn get_all(&self) -> Result<Vec<AlarmRecord>, StoreError> {
        Ok(self.records.lock().await.clone())
    }

    async fn update(&self, record: &AlarmRecord) -> Result<usize, StoreError> {
        let mut records = self.records.lock().await;
        let Some(index) = records.iter().position(|r| r.id == record.id) else {
            return Ok(0);
        };

        let mut next = records.clone();
        next[index] = record.clone();
        self.persist(&next).await?;
        *records = next;
        Ok(1)
    }

    async fn delete(&self, id: AlarmId) -> Result<usize, StoreError> {
        let mut records = self.records.lock().await;
        let next: Vec<_> = records.iter().filter(|r| r.id != id).cloned().collect();
        let removed = records.len() - next.len();
        if removed > 0 {
            self.persist(&next).await?;
            *records = next;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use time::UtcOffset;
    use time::macros::datetime;

    use super::*;
    use crate::record::{Place, TransitMode, TravelMode};
    use crate::types::{ClockTime, DaysOfWeek, PrepTime};

    fn populated_record() -> AlarmRecord {
        let mut record = AlarmRecord::with_defaults(datetime!(2026-11-30 20:00 UTC)).unwrap();
        record.origin = Place::new("ChIJhome", "1 Home St");
        record.destination = Place::new("ChIJwork", "2 Work Ave");
        record.travel_mode = TravelMode::Transit;
        record.transit_mode = TransitMode::Tram;
        record.repeat_days = DaysOfWeek::TUESDAY | DaysOfWeek::SATURDAY;
        record.prep_time = PrepTime::new(0, 45).unwrap();
        record
            .set_times(
                ClockTime::new(365, 23, 10),
                ClockTime::new(366, 0, 20),
                2026,
                UtcOffset::UTC,
            )
            .unwrap();
        record.alarm_armed = true;
        record.smart_armed = true;
        record
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.json");

        let original = populated_record();
        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.create(original.clone()).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let read_back = reopened.get(original.id).await.unwrap();
        assert_eq!(read_back, original);
        assert_eq!(read_back.repeat_days.coded(), 0b010_0010);
        assert_eq!(read_back.arrival, ClockTime::new(366, 0, 20));
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.json");
        let store = JsonFileStore::open(&path).await.unwrap();

        let mut keep = store.create(populated_record()).await.unwrap();
        let drop = store.create(populated_record()).await.unwrap();
        keep.smart_armed = false;
        assert_eq!(store.update(&keep).await.unwrap(), 1);
        assert_eq!(store.delete(drop.id).await.unwrap(), 1);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let all = reopened.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].smart_armed);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(StoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn unknown_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.json");
        tokio::fs::write(&path, br#"{"version": 7, "alarms": []}"#)
            .await
            .unwrap();

        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(StoreError::Corrupt(msg)) if msg.contains('7')
        ));
    }
}
