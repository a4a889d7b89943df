//! Gateway services
//!
//! - [transfer]: buffered vs streamed writes to the store
//! - [access]: ownership checks, signed grants, deletes
//! - [gateway]: the upload pipeline composing validation, keys and transfer

pub mod access;
pub mod gateway;
pub mod transfer;
pub mod types;
