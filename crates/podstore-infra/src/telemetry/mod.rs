//! Tracing initialization
//!
//! Installs a `tracing` registry with an `EnvFilter` (from `RUST_LOG`) and a
//! fmt layer, human-readable by default or JSON lines for log shippers.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
