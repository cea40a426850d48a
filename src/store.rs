use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::trace;

use crate::types::StatusRecord;

/// Deduplicated, insertion-ordered collection of reachable servers.
///
/// Cloning is cheap and yields a handle to the same store. The ordered list
/// and the identity index sit behind a single mutex so a merge is atomic with
/// respect to every other merge and snapshot.
#[derive(Clone, Debug, Default)]
pub struct ResultStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: Vec<StatusRecord>,
    index: HashMap<String, usize>,
}

/// What a merge did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEffect {
    Inserted,
    Replaced,
    /// The record had no resolvable identity and was dropped.
    Skipped,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record`, or replace the record with the same identity in place.
    ///
    /// Replacement keeps the first-seen position. Racing merges of one
    /// identity resolve as last-writer-wins in lock acquisition order.
    pub async fn merge(&self, record: StatusRecord) -> MergeEffect {
        let Some(key) = record.identity().map(str::to_owned) else {
            return MergeEffect::Skipped;
        };
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if let Some(&slot) = inner.index.get(&key) {
            inner.records[slot] = record;
            trace!(identity = %key, "replaced record");
            MergeEffect::Replaced
        } else {
            inner.index.insert(key, inner.records.len());
            inner.records.push(record);
            MergeEffect::Inserted
        }
    }

    /// Point-in-time copy of the records in insertion order.
    pub async fn snapshot(&self) -> Vec<StatusRecord> {
        self.inner.lock().await.records.clone()
    }

    pub async fn get(&self, identity: &str) -> Option<StatusRecord> {
        let guard = self.inner.lock().await;
        guard
            .index
            .get(identity)
            .map(|&slot| guard.records[slot].clone())
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        let mut guard = self.inner.lock().await;
        guard.records.clear();
        guard.index.clear();
    }
}
