//! API constants

/// Versioned API path prefix
pub const API_PREFIX: &str = "/api/v0";

/// Header carrying the caller's tenant, set by the authenticating proxy
pub const TENANT_ID_HEADER: &str = "X-Tenant-Id";
/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying the caller's role (`admin` | `member`)
pub const USER_ROLE_HEADER: &str = "X-User-Role";
