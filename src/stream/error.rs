//! Error types for virtual stream operations.

use std::io;

use thiserror::Error;

use crate::store::StoreError;

/// Result type for stream operations.
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Errors that can occur while building or reading a virtual stream.
///
/// Read failures carry the number of bytes already written into the caller's
/// buffer, see [`StreamError::bytes_read`].
#[derive(Debug, Error)]
pub enum StreamError {
    /// Size lookup failed while opening the stream.
    #[error("Failed to look up size of '{key}': {source}")]
    Metadata {
        /// Key whose lookup failed
        key: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// The requested offset lies at or past the end of the stream.
    #[error("End of stream at offset {offset}")]
    EndOfStream {
        /// Logical offset the read started from
        offset: u64,
    },

    /// A segment returned fewer bytes than its recorded size implies.
    #[error("Short read from '{key}': expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Key of the segment
        key: String,
        /// Bytes requested from the segment
        expected: u64,
        /// Bytes the store delivered
        actual: u64,
        /// Bytes written to the destination before the failure
        bytes_read: usize,
    },

    /// The store failed while fetching a range.
    #[error("Failed to fetch range from '{key}': {source}")]
    Fetch {
        /// Key of the segment
        key: String,
        /// Bytes written to the destination before the failure
        bytes_read: usize,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Seek mode outside start/current/end.
    #[error("Invalid whence: {0}")]
    InvalidWhence(i32),

    /// Seek target is negative or not representable.
    #[error("Invalid offset: {0}")]
    InvalidOffset(i128),
}

impl StreamError {
    /// Bytes written to the destination buffer before this error surfaced.
    #[must_use]
    pub fn bytes_read(&self) -> usize {
        match self {
            Self::ShortRead { bytes_read, .. } | Self::Fetch { bytes_read, .. } => *bytes_read,
            _ => 0,
        }
    }

    /// Returns `true` for the end-of-stream condition.
    #[must_use]
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream { .. })
    }

    /// Folds in bytes that earlier segments contributed to the same read.
    pub(crate) fn with_prior_bytes(mut self, prior: usize) -> Self {
        match &mut self {
            Self::ShortRead { bytes_read, .. } | Self::Fetch { bytes_read, .. } => {
                *bytes_read += prior;
            }
            _ => {}
        }
        self
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match &err {
            StreamError::EndOfStream { .. } | StreamError::ShortRead { .. } => {
                io::ErrorKind::UnexpectedEof
            }
            StreamError::InvalidWhence(_) | StreamError::InvalidOffset(_) => {
                io::ErrorKind::InvalidInput
            }
            StreamError::Metadata { source, .. } | StreamError::Fetch { source, .. }
                if source.is_not_found() =>
            {
                io::ErrorKind::NotFound
            }
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> StoreError {
        StoreError::NotFound {
            bucket: "b".into(),
            key: "k".into(),
        }
    }

    #[test]
    fn test_bytes_read_accumulates() {
        let err = StreamError::Fetch {
            key: "k".into(),
            bytes_read: 0,
            source: not_found(),
        }
        .with_prior_bytes(3)
        .with_prior_bytes(4);
        assert_eq!(err.bytes_read(), 7);

        let eos = StreamError::EndOfStream { offset: 15 }.with_prior_bytes(9);
        assert_eq!(eos.bytes_read(), 0);
    }

    #[test]
    fn test_io_error_kinds() {
        let eof: io::Error = StreamError::ShortRead {
            key: "k".into(),
            expected: 4,
            actual: 2,
            bytes_read: 2,
        }
        .into();
        assert_eq!(eof.kind(), io::ErrorKind::UnexpectedEof);

        let invalid: io::Error = StreamError::InvalidOffset(-1).into();
        assert_eq!(invalid.kind(), io::ErrorKind::InvalidInput);

        let missing: io::Error = StreamError::Fetch {
            key: "k".into(),
            bytes_read: 0,
            source: not_found(),
        }
        .into();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_source_is_preserved() {
        use std::error::Error as _;

        let err = StreamError::Metadata {
            key: "k".into(),
            source: not_found(),
        };
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<StoreError>().unwrap().is_not_found());
    }
}
