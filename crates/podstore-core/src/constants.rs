//! Gateway-wide constants.

/// Shortest signed grant lifetime, in seconds.
pub const MIN_GRANT_EXPIRY_SECS: u64 = 1;

/// Longest signed grant lifetime (7 days), in seconds.
pub const MAX_GRANT_EXPIRY_SECS: u64 = 604_800;

/// Grant lifetime used when the caller does not ask for one.
pub const DEFAULT_GRANT_EXPIRY_SECS: u64 = 3_600;

/// Payloads larger than this are always streamed to the object store.
pub const STREAMING_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;

/// Base name used when a sanitized filename ends up empty.
pub const FALLBACK_FILE_NAME: &str = "file";

/// Object metadata keys attached to every stored object.
pub const METADATA_ORIGINAL_FILENAME: &str = "original-filename";
pub const METADATA_UPLOADED_BY: &str = "uploaded-by";
pub const METADATA_TENANT_ID: &str = "tenant-id";
pub const METADATA_CATEGORY: &str = "category";
