use std::collections::VecDeque;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{ErrorRecord, ErrorStore, StoreError};

/// Keeps records in memory, oldest evicted first once `max_records` is hit.
#[derive(Debug)]
pub struct MemoryErrorStore {
    name: String,
    max_records: Option<usize>,
    records: RwLock<VecDeque<ErrorRecord>>,
}

impl Default for MemoryErrorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryErrorStore {
    pub fn new() -> Self {
        Self {
            name: String::from("Memory Error Store"),
            max_records: None,
            records: RwLock::new(VecDeque::new()),
        }
    }

    /// Bound the store. A cap of zero is treated as one.
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = Some(max_records.max(1));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait::async_trait]
impl ErrorStore for MemoryErrorStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn log(&self, record: ErrorRecord) -> Result<Uuid, StoreError> {
        let id = record.id;
        let mut records = self.records.write().await;
        records.push_back(record);
        if let Some(max) = self.max_records {
            while records.len() > max {
                if let Some(evicted) = records.pop_front() {
                    tracing::debug!(store = %self.name, id = %evicted.id, "evicted oldest record");
                }
            }
        }
        tracing::debug!(store = %self.name, %id, "logged record");
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<ErrorRecord, StoreError> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }

    async fn all(&self) -> Result<Vec<ErrorRecord>, StoreError> {
        Ok(self.records.read().await.iter().rev().cloned().collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use snag_error::Fault;

    use super::*;

    fn record(message: &str) -> ErrorRecord {
        ErrorRecord::from_fault(&Fault::new(message), "app", &BTreeMap::new())
    }

    #[tokio::test]
    async fn log_get_count_delete() {
        let store = MemoryErrorStore::new();
        assert_eq!(store.count().await.unwrap(), 0);

        let id = store.log(record("one")).await.unwrap();
        store.log(record("two")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.get(id).await.unwrap().message, "one");

        let newest_first: Vec<_> = store
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(newest_first, vec!["two", "one"]);

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert_eq!(store.get(id).await.unwrap_err(), StoreError::NotFound(id));
    }

    #[tokio::test]
    async fn cap_evicts_oldest() {
        let store = MemoryErrorStore::new().with_max_records(2).with_name("capped");
        assert_eq!(store.name(), "capped");
        for m in ["a", "b", "c"] {
            store.log(record(m)).await.unwrap();
        }
        let kept: Vec<_> = store.all().await.unwrap().into_iter().map(|r| r.message).collect();
        assert_eq!(kept, vec!["c", "b"]);
    }
}
