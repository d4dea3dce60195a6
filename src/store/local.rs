//! Local directory object store for running without network.

#![allow(clippy::cast_possible_truncation)]

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use super::error::StoreError;
use super::source::{ObjectStore, StoreResult};

/// Object store that maps buckets to subdirectories of a root directory.
///
/// `bucket/key` resolves to `root/bucket/key`. This serves the same range
/// interface as [`HttpObjectStore`](super::HttpObjectStore), which makes it
/// useful for tests, demos, and development.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Opens a directory as the store root.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` does not exist or is not a directory.
    pub fn open<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !std::fs::metadata(&root)?.is_dir() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("{} is not a directory", root.display()),
            )));
        }
        Ok(Self { root })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves an object to its file path, rejecting keys that escape the bucket.
    pub fn object_path(&self, bucket: &str, key: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(key);
        let plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain || bucket.contains(['/', '\\']) || bucket == ".." {
            return Err(StoreError::InvalidKey {
                key: format!("{bucket}/{key}"),
            });
        }
        Ok(self.root.join(bucket).join(relative))
    }

    fn open_object(&self, bucket: &str, key: &str) -> StoreResult<File> {
        let path = self.object_path(bucket, key)?;
        File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            _ => StoreError::Io(e),
        })
    }
}

impl ObjectStore for LocalObjectStore {
    fn object_size(&self, bucket: &str, key: &str) -> StoreResult<u64> {
        Ok(self.open_object(bucket, key)?.metadata()?.len())
    }

    fn read_range(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> StoreResult<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.open_object(bucket, key)?;
        file.seek(SeekFrom::Start(offset))?;

        // Whatever is left in the file, up to `length`.
        let mut buffer = Vec::with_capacity(length.min(1 << 20) as usize);
        file.take(length).read_to_end(&mut buffer)?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_with(objects: &[(&str, &[u8])]) -> (tempfile::TempDir, LocalObjectStore) {
        let dir = tempdir().unwrap();
        for (key, data) in objects {
            let path = dir.path().join("bucket").join(key);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, data).unwrap();
        }
        let store = LocalObjectStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_local_store_read_range() {
        let data = b"Hello, World! This is test data for streaming.";
        let (_dir, store) = store_with(&[("greeting.txt", &data[..])]);

        assert_eq!(
            store.object_size("bucket", "greeting.txt").unwrap(),
            data.len() as u64
        );

        let chunk = store.read_range("bucket", "greeting.txt", 0, 5).unwrap();
        assert_eq!(&chunk, b"Hello");

        let chunk = store.read_range("bucket", "greeting.txt", 7, 6).unwrap();
        assert_eq!(&chunk, b"World!");

        let chunk = store
            .read_range("bucket", "greeting.txt", data.len() as u64 - 10, 10)
            .unwrap();
        assert_eq!(&chunk, b"streaming.");
    }

    #[test]
    fn test_local_store_nested_keys() {
        let (dir, store) = store_with(&[("2024/01/part-0001", &b"abc"[..])]);
        assert_eq!(store.root(), dir.path());
        assert_eq!(
            store.object_path("bucket", "2024/01/part-0001").unwrap(),
            dir.path().join("bucket/2024/01/part-0001")
        );
        let chunk = store.read_range("bucket", "2024/01/part-0001", 1, 2).unwrap();
        assert_eq!(&chunk, b"bc");
    }

    #[test]
    fn test_local_store_empty_read() {
        let (_dir, store) = store_with(&[("t", &b"test"[..])]);
        let chunk = store.read_range("bucket", "t", 0, 0).unwrap();
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_local_store_returns_short_data() {
        let (_dir, store) = store_with(&[("short", &b"short"[..])]);
        let chunk = store.read_range("bucket", "short", 2, 100).unwrap();
        assert_eq!(&chunk, b"ort");
    }

    #[test]
    fn test_local_store_missing_object() {
        let (_dir, store) = store_with(&[]);
        let err = store.object_size("bucket", "nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_local_store_rejects_escaping_keys() {
        let (_dir, store) = store_with(&[]);
        for key in ["../secret", "/etc/passwd", "a/../../b", ""] {
            let err = store.object_path("bucket", key).unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey { .. }), "{key}");
        }
    }
}
