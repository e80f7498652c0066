//! In-memory KV store implementation using `DashMap`.
//!
//! This is the default backend - data is lost on process restart.

use super::KvStore;
use crate::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-memory key-value store using lock-free concurrent hashmap.
///
/// Thread-safe and optimized for high-concurrency read/write workloads.
/// Writers to different keys usually land on different shards and do not
/// contend; `update` holds only the shard of its own key.
///
/// # Example
///
/// ```rust
/// use trueno_tracking::kv::{KvStore, MemoryKvStore};
///
/// # async fn example() -> trueno_tracking::Result<()> {
/// let store = MemoryKvStore::new();
/// store.update("hello", |_| Ok(Some(b"world".to_vec()))).await?;
/// assert_eq!(store.get("hello").await?, Some(b"world".to_vec()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryKvStore {
    store: DashMap<String, Vec<u8>>,
}

impl MemoryKvStore {
    /// Create a new in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Create with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: DashMap::with_capacity(capacity),
        }
    }

    /// Get the number of entries in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.get(key).map(|v| v.value().clone()))
    }

    async fn update<F>(&self, key: &str, f: F) -> Result<()>
    where
        F: FnOnce(Option<&[u8]>) -> Result<Option<Vec<u8>>> + Send,
    {
        // The entry guard keeps the shard write-locked for the whole closure.
        match self.store.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if let Some(next) = f(Some(entry.get().as_slice()))? {
                    entry.insert(next);
                }
            }
            Entry::Vacant(entry) => {
                if let Some(next) = f(None)? {
                    entry.insert(next);
                }
            }
        }
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mut rows: Vec<(String, Vec<u8>)> = self
            .store
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }
}
