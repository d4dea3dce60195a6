//! In-memory object store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::error::StoreError;
use super::source::{ObjectStore, StoreResult};

/// Object store holding every object in memory.
///
/// Cloning shares the underlying map. Handy as a fake backend in tests and
/// benchmarks.
#[derive(Clone, Debug, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<(String, String), Arc<Vec<u8>>>>>,
}

impl MemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an object.
    pub fn put(&self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) {
        let mut objects = self
            .objects
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        objects.insert(
            (bucket.to_string(), key.to_string()),
            Arc::new(bytes.into()),
        );
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    /// Returns `true` if no objects are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_map(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<(String, String), Arc<Vec<u8>>>> {
        self.objects
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn get(&self, bucket: &str, key: &str) -> StoreResult<Arc<Vec<u8>>> {
        self.read_map()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

impl ObjectStore for MemoryObjectStore {
    fn object_size(&self, bucket: &str, key: &str) -> StoreResult<u64> {
        Ok(self.get(bucket, key)?.len() as u64)
    }

    fn read_range(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> StoreResult<Vec<u8>> {
        let bytes = self.get(bucket, key)?;
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(bytes.len());
        let end = usize::try_from(length)
            .map_or(bytes.len(), |len| start.saturating_add(len))
            .min(bytes.len());
        Ok(bytes[start..end].to_vec())
    }
}
