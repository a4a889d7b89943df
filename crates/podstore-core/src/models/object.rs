use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::FileCategory;

/// Reference returned after a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadedObject {
    pub key: String,
    /// Public URL, or a signed URL when the upload asked for an expiry.
    pub url: String,
    pub bucket: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub category: Option<FileCategory>,
}

/// Time-bounded read access to a private object. Generated per request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignedAccessGrant {
    pub key: String,
    pub signed_url: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeletedObject {
    pub key: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicObjectUrl {
    pub key: String,
    pub url: String,
}
