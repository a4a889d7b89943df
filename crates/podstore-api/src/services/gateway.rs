//! Storage gateway
//!
//! Upload pipeline: expiry check → validate → namespace key → transfer → URL.
//! Nothing reaches the store until every client-controlled input has been
//! accepted.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use podstore_core::validation::{file_extension, normalize_content_type};
use podstore_core::{
    build_key, AppError, Config, ContentValidator, DeletedObject, FileCategory, PolicyTable,
    Principal, PublicObjectUrl, SignedAccessGrant, StorageBackend, UploadedObject,
    ValidationFailed,
};
use podstore_storage::{ObjectReader, Storage, StorageError};
use tokio::io::AsyncReadExt;

use super::access::{resolve_expiry, AccessBroker};
use super::transfer::{provenance_metadata, write_object, Payload};
use super::types::{UploadBody, UploadDescriptor, UploadOptions};
use crate::error::map_storage_error;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
pub struct StorageGateway {
    storage: Arc<dyn Storage>,
    validator: ContentValidator,
    broker: AccessBroker,
    streaming_threshold: u64,
}

impl StorageGateway {
    pub fn new(
        storage: Arc<dyn Storage>,
        policies: Arc<PolicyTable>,
        streaming_threshold: u64,
        default_expiry_secs: u64,
    ) -> Self {
        Self {
            broker: AccessBroker::new(storage.clone(), default_expiry_secs),
            validator: ContentValidator::new(policies),
            storage,
            streaming_threshold,
        }
    }

    pub fn from_config(storage: Arc<dyn Storage>, config: &Config) -> Self {
        Self::new(
            storage,
            Arc::new(config.policy_table()),
            config.streaming_threshold_bytes(),
            config.default_grant_expiry_secs(),
        )
    }

    pub fn policies(&self) -> &PolicyTable {
        self.validator.policies()
    }

    pub fn backend_type(&self) -> StorageBackend {
        self.storage.backend_type()
    }

    pub fn bucket_name(&self) -> &str {
        self.storage.bucket_name()
    }

    /// Validate and store a client upload under the principal's tenant.
    #[tracing::instrument(
        skip(self, principal, descriptor, options),
        fields(
            tenant_id = %principal.tenant_id,
            user_id = %principal.user_id,
            filename = %descriptor.filename,
            size_bytes = descriptor.body.len()
        )
    )]
    pub async fn upload(
        &self,
        principal: &Principal,
        descriptor: UploadDescriptor,
        options: UploadOptions,
    ) -> Result<UploadedObject, AppError> {
        let grant_expiry = options
            .expires_in
            .map(|requested| resolve_expiry(Some(requested), self.broker.default_expiry_secs()))
            .transpose()?;

        let UploadDescriptor {
            filename,
            content_type,
            body,
        } = descriptor;

        let (category, payload) = match body {
            UploadBody::Buffered(bytes) => {
                let category = self
                    .validator
                    .validate(&bytes, &filename, &content_type, options.file_type)
                    .map_err(rejected)?;
                (category, Payload::Buffered(bytes))
            }
            UploadBody::Streamed {
                mut reader,
                byte_count,
            } => {
                let probe_len = (self.policies().probe_len() as u64).min(byte_count) as usize;
                let mut head = vec![0u8; probe_len];
                reader
                    .read_exact(&mut head)
                    .await
                    .map_err(|e| map_storage_error("upload", StorageError::IoError(e)))?;

                let category = self
                    .validator
                    .validate_parts(
                        &head,
                        byte_count,
                        &filename,
                        &content_type,
                        options.file_type,
                    )
                    .map_err(rejected)?;

                let reader: ObjectReader = Box::pin(io::Cursor::new(head).chain(reader));
                (
                    category,
                    Payload::Streamed {
                        reader,
                        content_length: byte_count,
                    },
                )
            }
        };

        let key = build_key(principal, options.prefix.as_deref(), Some(&filename))?;
        let mime_type = normalize_content_type(&content_type);
        let metadata = provenance_metadata(principal, &filename, Some(category));

        let (strategy, size_bytes) = write_object(
            self.storage.as_ref(),
            &key,
            payload,
            &mime_type,
            &metadata,
            self.streaming_threshold,
        )
        .await
        .map_err(|e| map_storage_error("upload", e))?;

        let url = match grant_expiry {
            Some(secs) => self
                .storage
                .presigned_url(&key, Duration::from_secs(secs))
                .await
                .map_err(|e| map_storage_error("sign", e))?,
            None => self.storage.public_url(&key),
        };

        tracing::info!(
            key = %key,
            category = %category,
            size_bytes,
            strategy = strategy.as_str(),
            "Upload stored"
        );

        Ok(UploadedObject {
            key,
            url,
            bucket: self.storage.bucket_name().to_string(),
            size_bytes,
            mime_type,
            category: Some(category),
        })
    }

    /// Store content produced by the service itself without validating it.
    ///
    /// The key is still namespaced under the principal's tenant and the
    /// transfer strategy still applies.
    #[tracing::instrument(
        skip(self, principal, descriptor),
        fields(tenant_id = %principal.tenant_id, filename = %descriptor.filename)
    )]
    pub async fn store_trusted(
        &self,
        principal: &Principal,
        key_prefix: Option<&str>,
        descriptor: UploadDescriptor,
    ) -> Result<UploadedObject, AppError> {
        let UploadDescriptor {
            filename,
            content_type,
            body,
        } = descriptor;

        let mut mime_type = normalize_content_type(&content_type);
        if mime_type.is_empty() {
            mime_type = FALLBACK_CONTENT_TYPE.to_string();
        }
        let category = self.classify(&filename, &mime_type);

        let key = build_key(principal, key_prefix, Some(&filename))?;
        let metadata = provenance_metadata(principal, &filename, category);

        let (_, size_bytes) = write_object(
            self.storage.as_ref(),
            &key,
            body.into(),
            &mime_type,
            &metadata,
            self.streaming_threshold,
        )
        .await
        .map_err(|e| map_storage_error("upload", e))?;

        Ok(UploadedObject {
            url: self.storage.public_url(&key),
            key,
            bucket: self.storage.bucket_name().to_string(),
            size_bytes,
            mime_type,
            category,
        })
    }

    pub async fn get_access_grant(
        &self,
        principal: &Principal,
        key: &str,
        expires_in: Option<f64>,
    ) -> Result<SignedAccessGrant, AppError> {
        self.broker.issue_grant(principal, key, expires_in).await
    }

    pub async fn delete(&self, principal: &Principal, key: &str) -> Result<DeletedObject, AppError> {
        self.broker.delete(principal, key).await
    }

    pub fn public_url(&self, key: &str) -> PublicObjectUrl {
        self.broker.public_url(key)
    }

    fn classify(&self, filename: &str, mime_type: &str) -> Option<FileCategory> {
        let policies = self.policies();
        file_extension(filename)
            .and_then(|ext| policies.category_for_extension(&ext))
            .or_else(|| policies.category_for_content_type(mime_type))
    }
}

fn rejected(failed: ValidationFailed) -> AppError {
    let codes: Vec<&str> = failed.errors.iter().map(|e| e.code()).collect();
    tracing::debug!(
        category = ?failed.category,
        issues = ?codes,
        "Upload rejected by content validation"
    );
    AppError::Validation(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{Call, RecordingStorage};
    use bytes::Bytes;
    use podstore_core::constants::{METADATA_CATEGORY, METADATA_ORIGINAL_FILENAME};
    use podstore_core::Role;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn gateway(threshold: u64) -> (Arc<RecordingStorage>, StorageGateway) {
        let storage = Arc::new(RecordingStorage::new());
        let gateway = StorageGateway::new(
            storage.clone(),
            Arc::new(PolicyTable::new()),
            threshold,
            3600,
        );
        (storage, gateway)
    }

    fn png(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[..8].copy_from_slice(&PNG_HEADER);
        data
    }

    fn descriptor(filename: &str, content_type: &str, data: Vec<u8>) -> UploadDescriptor {
        UploadDescriptor {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            body: UploadBody::Buffered(Bytes::from(data)),
        }
    }

    fn streamed(filename: &str, content_type: &str, data: Vec<u8>, declared: u64) -> UploadDescriptor {
        UploadDescriptor {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            body: UploadBody::Streamed {
                reader: Box::pin(io::Cursor::new(data)),
                byte_count: declared,
            },
        }
    }

    fn covers() -> UploadOptions {
        UploadOptions {
            prefix: Some("covers".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_cover_upload_key_layout() {
        let (storage, gateway) = gateway(10 * 1024 * 1024);
        let principal = Principal::new("t1", "u1", Role::Member);

        let uploaded = gateway
            .upload(
                &principal,
                descriptor("cover.png", "image/png", png(3 * 1024 * 1024)),
                covers(),
            )
            .await
            .unwrap();

        let segments: Vec<&str> = uploaded.key.split('/').collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(&segments[..2], &["t1", "covers"]);
        assert!(segments[2].ends_with("-cover.png"));
        assert!(segments[2].len() > "-cover.png".len());

        assert_eq!(uploaded.category, Some(FileCategory::Image));
        assert_eq!(uploaded.mime_type, "image/png");
        assert_eq!(uploaded.size_bytes, 3 * 1024 * 1024);
        assert_eq!(uploaded.bucket, "recording");
        assert_eq!(uploaded.url, format!("https://store.test/{}", uploaded.key));
        assert_eq!(storage.calls(), vec![Call::Put(uploaded.key.clone())]);

        let metadata = storage.metadata(&uploaded.key).unwrap();
        assert_eq!(metadata[METADATA_ORIGINAL_FILENAME], "cover.png");
        assert_eq!(metadata[METADATA_CATEGORY], "image");
    }

    #[tokio::test]
    async fn test_rejected_upload_stores_nothing() {
        let (storage, gateway) = gateway(1024);
        let principal = Principal::new("t1", "u1", Role::Member);

        let err = gateway
            .upload(
                &principal,
                descriptor("track.mp3", "audio/mpeg", vec![b'a'; 200]),
                UploadOptions::default(),
            )
            .await
            .unwrap_err();

        match err {
            AppError::Validation(failed) => assert!(failed.has("SIGNATURE_MISMATCH")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_expiry_checked_before_store() {
        let (storage, gateway) = gateway(1024);
        let principal = Principal::new("t1", "u1", Role::Member);

        let err = gateway
            .upload(
                &principal,
                descriptor("cover.png", "image/png", png(64)),
                UploadOptions {
                    expires_in: Some(0.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidExpiry(_)));
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_with_expiry_returns_signed_url() {
        let (storage, gateway) = gateway(1024);
        let principal = Principal::new("t1", "u1", Role::Member);

        let uploaded = gateway
            .upload(
                &principal,
                descriptor("cover.png", "image/png", png(64)),
                UploadOptions {
                    expires_in: Some(59.5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(uploaded.url.ends_with("?expires=60"));
        assert_eq!(
            storage.calls(),
            vec![
                Call::Put(uploaded.key.clone()),
                Call::Presign(uploaded.key.clone(), 60)
            ]
        );
    }

    #[tokio::test]
    async fn test_large_stream_keeps_probed_head() {
        let (storage, gateway) = gateway(64);
        let principal = Principal::new("t1", "u1", Role::Member);
        let data = png(500);

        let uploaded = gateway
            .upload(
                &principal,
                streamed("cover.png", "image/png", data.clone(), 500),
                UploadOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(uploaded.size_bytes, 500);
        assert_eq!(storage.calls(), vec![Call::PutStream(uploaded.key.clone())]);
        assert_eq!(storage.object(&uploaded.key).unwrap(), data);
    }

    #[tokio::test]
    async fn test_stream_shorter_than_declared_is_client_error() {
        let (storage, gateway) = gateway(64);
        let principal = Principal::new("t1", "u1", Role::Member);

        let err = gateway
            .upload(
                &principal,
                streamed("cover.png", "image/png", png(100), 500),
                UploadOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)), "{:?}", err);
        match &storage.calls()[..] {
            [Call::PutStream(key)] => assert!(storage.object(key).is_none()),
            other => panic!("unexpected calls: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_longer_than_declared_is_client_error() {
        let (storage, gateway) = gateway(1024);
        let principal = Principal::new("t1", "u1", Role::Member);
        let mut data = png(200);
        data.extend_from_slice(&[0u8; 50]);

        let err = gateway
            .upload(
                &principal,
                streamed("cover.png", "image/png", data, 200),
                UploadOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)), "{:?}", err);
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stream_size_limit_uses_declared_length() {
        let (storage, gateway) = gateway(64);
        let principal = Principal::new("t1", "u1", Role::Member);

        let err = gateway
            .upload(
                &principal,
                streamed("cover.png", "image/png", png(16), 21 * 1024 * 1024),
                UploadOptions::default(),
            )
            .await
            .unwrap_err();

        match err {
            AppError::Validation(failed) => assert!(failed.has("FILE_TOO_LARGE")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expected_category_enforced() {
        let (_, gateway) = gateway(1024);
        let principal = Principal::new("t1", "u1", Role::Member);

        let err = gateway
            .upload(
                &principal,
                descriptor("cover.png", "image/png", png(64)),
                UploadOptions {
                    file_type: Some(FileCategory::Audio),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        match err {
            AppError::Validation(failed) => assert!(failed.has("CATEGORY_MISMATCH")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_store_trusted_skips_validation() {
        let (storage, gateway) = gateway(1024);
        let principal = Principal::new("t1", "system", Role::Admin);

        let stored = gateway
            .store_trusted(
                &principal,
                Some("transcripts"),
                descriptor("episode 12.txt", "", b"hello".to_vec()),
            )
            .await
            .unwrap();

        assert!(stored.key.starts_with("t1/transcripts/"));
        assert!(stored.key.ends_with("-episode-12.txt"));
        assert_eq!(stored.category, None);
        assert_eq!(stored.mime_type, "application/octet-stream");
        assert_eq!(storage.object(&stored.key).unwrap(), b"hello");
        assert_eq!(
            storage.content_type(&stored.key).unwrap(),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_repeated_uploads_never_collide() {
        let (storage, gateway) = gateway(1024);
        let principal = Principal::new("t1", "u1", Role::Member);

        let first = gateway
            .upload(&principal, descriptor("cover.png", "image/png", png(64)), covers())
            .await
            .unwrap();
        let second = gateway
            .upload(&principal, descriptor("cover.png", "image/png", png(64)), covers())
            .await
            .unwrap();

        assert_ne!(first.key, second.key);
        assert!(storage.object(&first.key).is_some());
        assert!(storage.object(&second.key).is_some());
    }
}
