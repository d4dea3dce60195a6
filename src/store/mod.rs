//! Object-store backends the virtual stream reads from.
//!
//! Every backend implements [`ObjectStore`]: one size lookup per object and
//! inclusive byte-range fetches. The stream layer never talks to a transport
//! directly.

mod error;
#[cfg(feature = "http")]
mod http;
mod local;
mod memory;
mod source;

pub use error::StoreError;
#[cfg(feature = "http")]
pub use http::{Addressing, HttpAuthConfig, HttpConfig, HttpObjectStore};
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use source::{ObjectStore, StoreResult, inclusive_range};
