//! Podstore Storage Library
//!
//! Remote object store abstraction for the gateway: the [`Storage`] trait and
//! its S3 and local filesystem implementations.
//!
//! Backends store objects under the exact key they are given. Key generation
//! and tenant scoping live in `podstore_core::keys`; backends only reject keys
//! that are structurally unsafe (`..`, leading `/`).

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;
pub(crate) mod url;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use podstore_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectMetadata, ObjectReader, Storage, StorageError, StorageResult};
