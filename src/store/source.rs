//! Trait defining the interface to an object-storage backend.

use super::error::StoreError;

/// Result type for object-store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Trait for object stores that serve sizes and byte ranges of named objects.
///
/// Implementations must tolerate concurrent range requests against the same
/// object, since positional reads on a stream take no lock.
pub trait ObjectStore: Send + Sync {
    /// Returns the size of `key` in `bucket`, in bytes.
    ///
    /// This is typically a HEAD request for HTTP backends.
    fn object_size(&self, bucket: &str, key: &str) -> StoreResult<u64>;

    /// Reads `length` bytes of `key` starting at `offset`.
    ///
    /// On the wire this is the inclusive range `[offset, offset + length - 1]`.
    /// The returned vector may be shorter than `length` if the object ends
    /// early; callers decide whether that is an error.
    fn read_range(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> StoreResult<Vec<u8>>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<T> {
    fn object_size(&self, bucket: &str, key: &str) -> StoreResult<u64> {
        (**self).object_size(bucket, key)
    }

    fn read_range(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> StoreResult<Vec<u8>> {
        (**self).read_range(bucket, key, offset, length)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for Box<T> {
    fn object_size(&self, bucket: &str, key: &str) -> StoreResult<u64> {
        (**self).object_size(bucket, key)
    }

    fn read_range(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> StoreResult<Vec<u8>> {
        (**self).read_range(bucket, key, offset, length)
    }
}

/// Formats the inclusive HTTP range header value for `length` bytes at `offset`.
///
/// `length` must be non-zero.
#[must_use]
pub fn inclusive_range(offset: u64, length: u64) -> String {
    let end = offset.saturating_add(length).saturating_sub(1);
    format!("bytes={offset}-{end}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusive_range_single_byte() {
        assert_eq!(inclusive_range(0, 1), "bytes=0-0");
        assert_eq!(inclusive_range(9, 1), "bytes=9-9");
    }

    #[test]
    fn test_inclusive_range_span() {
        assert_eq!(inclusive_range(7, 3), "bytes=7-9");
        assert_eq!(inclusive_range(0, 5), "bytes=0-4");
    }
}
