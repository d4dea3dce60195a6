//! Error types reported by object-store backends.

use thiserror::Error;

/// Errors that can occur while talking to an object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP error response from the storage endpoint.
    #[error("HTTP error: {status} - {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error message or response body
        message: String,
    },

    /// Endpoint URL is malformed or cannot carry object paths.
    #[error("Invalid endpoint {url}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Endpoint does not honour range requests.
    #[error("Server does not support range requests (Accept-Ranges: none)")]
    RangeNotSupported,

    /// Network error during HTTP request.
    #[cfg(feature = "http")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Object not found (HTTP 404 or missing file).
    #[error("Object not found: {bucket}/{key}")]
    NotFound {
        /// Bucket or container the lookup ran against
        bucket: String,
        /// Key that was not found
        key: String,
    },

    /// Size lookup response carried no usable `Content-Length`.
    #[error("Missing Content-Length for {bucket}/{key}")]
    MissingContentLength {
        /// Bucket or container the lookup ran against
        bucket: String,
        /// Key whose size could not be determined
        key: String,
    },

    /// Key is not a valid object name for this backend.
    #[error("Invalid object key: {key}")]
    InvalidKey {
        /// Offending key
        key: String,
    },

    /// I/O error when reading from a local backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` when the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns `true` for failures worth another attempt (network blips, timeouts, 5xx).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(feature = "http")]
            Self::Network(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
