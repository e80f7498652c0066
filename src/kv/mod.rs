//! Key-Value storage seam for the tracking stores
//!
//! Every tracking record is a serde_json document stored under a string key.
//! The physical engine behind this trait is external to the crate; it only
//! has to provide:
//! - per-key atomic read-modify-write (`update`)
//! - ordered prefix scans for listings
//!
//! # Example
//!
//! ```rust,no_run
//! use trueno_tracking::kv::{KvStore, MemoryKvStore};
//!
//! # async fn example() -> trueno_tracking::Result<()> {
//! let store = MemoryKvStore::new();
//!
//! store.update("summary/J1", |_| Ok(Some(b"{}".to_vec()))).await?;
//! let rows = store.scan_prefix("summary/").await?;
//! assert_eq!(rows.len(), 1);
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryKvStore;

use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// Key-value store trait backing every tracking sub-store.
///
/// Implementations must make each single-key operation atomic: a concurrent
/// reader observes either the previous or the new value, never a torn one.
/// Unreachable storage is reported as [`crate::Error::StorageUnavailable`].
pub trait KvStore: Send + Sync {
    /// Get a value by key.
    ///
    /// Returns `None` if the key doesn't exist.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Atomic read-modify-write of one key.
    ///
    /// `f` receives the current value and returns the value to store, or
    /// `None` to leave the key untouched. If `f` fails nothing is written.
    fn update<F>(&self, key: &str, f: F) -> impl Future<Output = Result<()>> + Send
    where
        F: FnOnce(Option<&[u8]>) -> Result<Option<Vec<u8>>> + Send;

    /// All entries whose key starts with `prefix`, sorted by key.
    ///
    /// Each value is read atomically; the scan as a whole is not a snapshot.
    fn scan_prefix(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<(String, Vec<u8>)>>> + Send;
}

/// Encode a tracking document for storage.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a stored tracking document.
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode every value of a prefix scan, keeping key order.
pub(crate) fn decode_all<T: DeserializeOwned>(rows: Vec<(String, Vec<u8>)>) -> Result<Vec<T>> {
    rows.iter().map(|(_, bytes)| decode(bytes)).collect()
}
