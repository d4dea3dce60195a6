//! One stored object participating in a virtual stream.

use std::sync::Arc;

use log::trace;

use super::error::{StreamError, StreamResult};
use crate::store::ObjectStore;

/// A fixed-size remote object that serves byte-range fetches.
///
/// The size is discovered once when the owning stream opens and never changes.
pub struct Segment<S: ObjectStore> {
    store: Arc<S>,
    bucket: Arc<str>,
    key: String,
    size: u64,
}

impl<S: ObjectStore> Segment<S> {
    /// Looks up the size of `key` and builds the segment.
    pub(crate) fn open(store: Arc<S>, bucket: Arc<str>, key: String) -> StreamResult<Self> {
        let size = store
            .object_size(&bucket, &key)
            .map_err(|source| StreamError::Metadata {
                key: key.clone(),
                source,
            })?;
        trace!("segment {bucket}/{key}: {size} bytes");
        Ok(Self {
            store,
            bucket,
            key,
            size,
        })
    }

    /// Key of the underlying object.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Bucket of the underlying object.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Size in bytes, fixed at open time.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Fills `buf` with bytes starting at `local_offset` within this object.
    ///
    /// The caller guarantees `local_offset + buf.len() <= size`. Issues exactly
    /// one range request and fails with [`StreamError::ShortRead`] if the store
    /// delivers fewer bytes than requested.
    pub fn fetch(&self, buf: &mut [u8], local_offset: u64) -> StreamResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let expected = buf.len() as u64;
        trace!(
            "fetch {}/{} [{}, {}]",
            self.bucket,
            self.key,
            local_offset,
            local_offset + expected - 1
        );

        let bytes = self
            .store
            .read_range(&self.bucket, &self.key, local_offset, expected)
            .map_err(|source| StreamError::Fetch {
                key: self.key.clone(),
                bytes_read: 0,
                source,
            })?;

        if bytes.len() < buf.len() {
            // Keep what arrived so the caller sees the same partial count it is told about.
            buf[..bytes.len()].copy_from_slice(&bytes);
            return Err(StreamError::ShortRead {
                key: self.key.clone(),
                expected,
                actual: bytes.len() as u64,
                bytes_read: bytes.len(),
            });
        }

        let len = buf.len();
        buf.copy_from_slice(&bytes[..len]);
        Ok(len)
    }
}

impl<S: ObjectStore> std::fmt::Debug for Segment<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryObjectStore, StoreError, StoreResult};

    struct TruncatingStore {
        inner: MemoryObjectStore,
        keep: usize,
    }

    impl ObjectStore for TruncatingStore {
        fn object_size(&self, bucket: &str, key: &str) -> StoreResult<u64> {
            self.inner.object_size(bucket, key)
        }

        fn read_range(
            &self,
            bucket: &str,
            key: &str,
            offset: u64,
            length: u64,
        ) -> StoreResult<Vec<u8>> {
            let mut bytes = self.inner.read_range(bucket, key, offset, length)?;
            bytes.truncate(self.keep);
            Ok(bytes)
        }
    }

    fn segment<S: ObjectStore>(store: S, key: &str) -> Segment<S> {
        Segment::open(Arc::new(store), Arc::from("b"), key.to_string()).unwrap()
    }

    #[test]
    fn test_fetch_exact_range() {
        let store = MemoryObjectStore::new();
        store.put("b", "a", b"0123456789".to_vec());
        let seg = segment(store, "a");

        assert_eq!(seg.size(), 10);
        assert_eq!(seg.key(), "a");
        assert_eq!(seg.bucket(), "b");

        let mut buf = [0u8; 3];
        assert_eq!(seg.fetch(&mut buf, 7).unwrap(), 3);
        assert_eq!(&buf, b"789");

        let mut one = [0u8; 1];
        assert_eq!(seg.fetch(&mut one, 0).unwrap(), 1);
        assert_eq!(&one, b"0");
    }

    #[test]
    fn test_fetch_empty_buffer_skips_store() {
        let inner = MemoryObjectStore::new();
        inner.put("b", "a", b"0123456789".to_vec());
        // keep == 0 would turn any real fetch into a short read.
        let seg = segment(TruncatingStore { inner, keep: 0 }, "a");

        let mut empty = [0u8; 0];
        assert_eq!(seg.fetch(&mut empty, 4).unwrap(), 0);
    }

    #[test]
    fn test_fetch_short_read() {
        let inner = MemoryObjectStore::new();
        inner.put("b", "a", b"0123456789".to_vec());
        let seg = segment(TruncatingStore { inner, keep: 2 }, "a");

        let mut buf = [0u8; 5];
        let err = seg.fetch(&mut buf, 3).unwrap_err();
        match err {
            StreamError::ShortRead {
                expected,
                actual,
                bytes_read,
                ..
            } => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 2);
                assert_eq!(bytes_read, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(&buf[..2], b"34");
    }

    #[test]
    fn test_open_reports_metadata_error() {
        let err = Segment::open(
            Arc::new(MemoryObjectStore::new()),
            Arc::from("b"),
            "nope".to_string(),
        )
        .unwrap_err();
        match err {
            StreamError::Metadata { key, source } => {
                assert_eq!(key, "nope");
                assert!(matches!(source, StoreError::NotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
