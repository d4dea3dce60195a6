//! Virtual concatenation of stored objects into one seekable byte stream.
//!
//! A [`VirtualStream`] maps a logical offset onto the [`Segment`]s that hold
//! it and issues one range fetch per touched object. Callers see a single
//! file-like stream with `read`, positional `read_at`, and `seek`, plus the
//! standard [`std::io::Read`] and [`std::io::Seek`] traits.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use objstream_core::store::MemoryObjectStore;
//! use objstream_core::stream::{VirtualStream, Whence};
//!
//! let store = MemoryObjectStore::new();
//! store.put("logs", "a", b"0123456789".to_vec());
//! store.put("logs", "b", b"abcde".to_vec());
//!
//! let stream = VirtualStream::open(Arc::new(store), "logs", ["a", "b"])?;
//! let mut buf = [0u8; 8];
//! assert_eq!(stream.read_at(&mut buf, 7)?, 8);
//! assert_eq!(&buf, b"789abcde");
//!
//! assert_eq!(stream.seek(-2, Whence::End)?, 13);
//! # Ok::<(), objstream_core::stream::StreamError>(())
//! ```

mod error;
mod segment;
mod virtual_stream;

pub use error::{StreamError, StreamResult};
pub use segment::Segment;
pub use virtual_stream::{VirtualStream, Whence};
