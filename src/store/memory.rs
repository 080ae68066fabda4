//! In-memory process store for single-instance deployments.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::traits::{ProcessStore, is_expired};
use crate::error::StoreError;
use crate::pipeline::types::{ProcessRecord, ResultSet};

/// `RwLock<HashMap>`-backed store. Every operation takes the lock once.
#[derive(Default)]
pub struct InMemoryProcessStore {
    records: RwLock<HashMap<Uuid, ProcessRecord>>,
    ttl: Option<Duration>,
}

impl InMemoryProcessStore {
    /// Store with no expiry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store whose records read as `NotFound` once older than `ttl`.
    pub fn with_ttl(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(HashMap::new()),
            ttl: Some(ttl),
        })
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ProcessStore for InMemoryProcessStore {
    async fn create(&self, document: Vec<u8>, result_set: ResultSet) -> Result<Uuid, StoreError> {
        let mut records = self.records.write().await;

        let mut id = Uuid::new_v4();
        while records.contains_key(&id) {
            id = Uuid::new_v4();
        }

        records.insert(
            id,
            ProcessRecord {
                correlation_id: id,
                source_document: document,
                result_set,
                created_at: Utc::now(),
            },
        );
        debug!(process_id = %id, "Process record created");
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<ProcessRecord, StoreError> {
        let records = self.records.read().await;
        match records.get(&id) {
            Some(record) if !is_expired(record.created_at, self.ttl, Utc::now()) => {
                Ok(record.clone())
            }
            _ => Err(StoreError::NotFound { id }),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        if self.records.write().await.remove(&id).is_some() {
            debug!(process_id = %id, "Process record deleted");
        }
        Ok(())
    }

    async fn purge_expired(&self, ttl: Duration) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !is_expired(record.created_at, Some(ttl), now));
        let purged = before - records.len();
        if purged > 0 {
            info!(count = purged, "Expired process records purged");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::PageExtraction;

    fn results() -> ResultSet {
        ResultSet::from_unordered(vec![
            PageExtraction::matched(1, "Aname".into(), "Aname".into(), "a@x.com".into()),
            PageExtraction::unmatched(2, None),
        ])
    }

    #[tokio::test]
    async fn get_returns_what_was_created() {
        let store = InMemoryProcessStore::new();
        let id = store.create(b"%PDF-1.5".to_vec(), results()).await.unwrap();

        let record = store.get(id).await.unwrap();
        assert_eq!(record.correlation_id, id);
        assert_eq!(record.source_document, b"%PDF-1.5".to_vec());
        assert_eq!(record.result_set, results());
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let store = InMemoryProcessStore::new();
        let a = store.create(vec![1], ResultSet::default()).await.unwrap();
        let b = store.create(vec![2], ResultSet::default()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn get_after_delete_is_not_found() {
        let store = InMemoryProcessStore::new();
        let id = store.create(vec![1], results()).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(matches!(store.get(id).await, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryProcessStore::new();
        let id = store.create(vec![1], results()).await.unwrap();
        store.delete(id).await.unwrap();
        store.delete(id).await.unwrap();
        store.delete(Uuid::new_v4()).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn expired_record_reads_as_not_found() {
        let store = InMemoryProcessStore::with_ttl(Duration::from_millis(10));
        let id = store.create(vec![1], results()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(matches!(store.get(id).await, Err(StoreError::NotFound { .. })));

        assert_eq!(store.purge_expired(Duration::from_millis(10)).await.unwrap(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn purge_keeps_fresh_records() {
        let store = InMemoryProcessStore::new();
        store.create(vec![1], results()).await.unwrap();
        assert_eq!(store.purge_expired(Duration::from_secs(3600)).await.unwrap(), 0);
        assert_eq!(store.len().await, 1);
    }
}
