//! Podstore Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! pure parts of the storage gateway: the category policy table, the content
//! validator and the tenant key namespacer. Nothing in here performs I/O.

pub mod config;
pub mod constants;
pub mod error;
pub mod keys;
pub mod models;
pub mod policy;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use keys::{build_key, is_owned_by};
pub use models::{
    DeletedObject, FileCategory, Principal, PublicObjectUrl, Role, SignedAccessGrant,
    UploadedObject,
};
pub use policy::{CategoryPolicy, PolicyTable, SignatureRule};
pub use storage_types::StorageBackend;
pub use validation::{ContentValidator, ValidationFailed, ValidationIssue};
