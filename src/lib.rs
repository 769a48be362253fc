//! Storage and attribute lookup for DICOM instances.
//!
//! A [`DicomEntry`] is built from a decoded object, persisted through a
//! [`Store`] backend, and queried by tag with [`query::resolve`].

pub mod codec;
pub mod config;
pub mod image_pipeline;
pub mod model;
pub mod query;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod test_support;

pub use config::{Backend, Config};
pub use model::{AttributeMatch, AttributeValue, DicomEntry, EntryError, TagRef};
pub use query::QueryError;
pub use store::{FileStore, MemStore, Store, StoreError};
