//! Caller identity
//!
//! Authentication happens upstream. The gateway trusts the identity headers
//! set by the authenticating proxy and turns them into a [`Principal`].
//!
//! [`Principal`]: podstore_core::Principal

pub mod middleware;
pub mod models;

pub use middleware::trusted_principal_middleware;
pub use models::RequestPrincipal;
