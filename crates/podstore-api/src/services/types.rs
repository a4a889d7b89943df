//! Types used by the gateway service

use bytes::Bytes;
use podstore_core::FileCategory;
use podstore_storage::ObjectReader;

use super::transfer::Payload;

/// Upload body: fully buffered, or a reader with its declared length.
pub enum UploadBody {
    Buffered(Bytes),
    Streamed {
        reader: ObjectReader,
        byte_count: u64,
    },
}

impl UploadBody {
    pub fn len(&self) -> u64 {
        match self {
            UploadBody::Buffered(bytes) => bytes.len() as u64,
            UploadBody::Streamed { byte_count, .. } => *byte_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<UploadBody> for Payload {
    fn from(body: UploadBody) -> Self {
        match body {
            UploadBody::Buffered(bytes) => Payload::Buffered(bytes),
            UploadBody::Streamed { reader, byte_count } => Payload::Streamed {
                reader,
                content_length: byte_count,
            },
        }
    }
}

/// Client-supplied description of an upload. Everything except the measured
/// body is an untrusted hint.
pub struct UploadDescriptor {
    pub filename: String,
    pub content_type: String,
    pub body: UploadBody,
}

/// Optional upload parameters.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Extra key segments below the tenant namespace
    pub prefix: Option<String>,
    /// Category the upload must belong to
    pub file_type: Option<FileCategory>,
    /// When set, the returned URL is a signed grant with this lifetime
    pub expires_in: Option<f64>,
}
