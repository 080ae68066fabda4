//! `ProcessStore` trait: keeps a phase-1 result alive until phase 2 runs.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::pipeline::types::{ProcessRecord, ResultSet};

/// Storage for [`ProcessRecord`]s addressed by an unguessable correlation id.
///
/// Each operation is atomic on its own; no lock is held between a `get` and
/// the `delete` that follows it. Two concurrent dispatches of the same id can
/// therefore both read the record before either deletes it.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Persist a new record under a fresh id and return the id.
    async fn create(&self, document: Vec<u8>, result_set: ResultSet) -> Result<Uuid, StoreError>;

    /// Fetch a record. Unknown, consumed and expired ids are all `NotFound`.
    async fn get(&self, id: Uuid) -> Result<ProcessRecord, StoreError>;

    /// Remove a record. Removing an absent id is not an error.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Remove every record older than `ttl`. Returns the number removed.
    async fn purge_expired(&self, ttl: Duration) -> Result<usize, StoreError>;
}

/// Whether a record created at `created_at` has outlived `ttl` at `now`.
pub(crate) fn is_expired(created_at: DateTime<Utc>, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
    let Some(ttl) = ttl else {
        return false;
    };
    match (now - created_at).to_std() {
        Ok(age) => age > ttl,
        // Created "in the future" (clock skew): not expired.
        Err(_) => false,
    }
}
