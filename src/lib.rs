//! Seekable byte streams over many range-addressable stored objects.
//!
//! Chunks of a larger logical file often live as separate objects in an
//! object store. This crate presents such a sequence of objects as one
//! contiguous stream: sequential reads, positional reads, and seeks relative
//! to the start, the current position, or the end, with only the needed byte
//! ranges fetched from the store.
//!
//! - [`store`]: the [`store::ObjectStore`] trait and its HTTP, local-directory,
//!   and in-memory backends.
//! - [`stream`]: [`stream::VirtualStream`] and the offset-to-object resolution.

#![forbid(unsafe_code)]

pub mod store;
pub mod stream;

pub use store::{ObjectStore, StoreError, StoreResult};
pub use stream::{Segment, StreamError, StreamResult, VirtualStream, Whence};
