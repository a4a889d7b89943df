//! Podstore API Library
//!
//! The gateway service (upload pipeline, transfer selection, access broker)
//! and the HTTP surface in front of it.

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;

// Public modules
pub mod auth;
pub mod error;
pub mod services;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::gateway::StorageGateway;
pub use services::types::{UploadBody, UploadDescriptor, UploadOptions};
