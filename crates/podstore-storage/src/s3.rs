use crate::traits::{ObjectMetadata, ObjectReader, Storage, StorageError, StorageResult};
use crate::url::join_url;
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutMultipartOptions,
    PutOptions, PutPayload, Result as ObjectResult, WriteMultipart,
};
use std::borrow::Cow;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Size of each multipart part sent to S3 (S3 minimum is 5 MiB).
const PART_SIZE: usize = 8 * 1024 * 1024;
/// Parts in flight at once during a streamed upload.
const MAX_CONCURRENT_PARTS: usize = 4;
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    public_base_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `public_base_url` - Optional base URL public links are built from
    ///   (e.g. a CDN in front of the bucket)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the standard AWS_* environment variables.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            public_base_url,
        })
    }

    /// Generate public URL for S3 object
    ///
    /// Uses the configured public base URL when there is one. Otherwise the
    /// custom endpoint (path-style) or the standard AWS virtual-hosted URL.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref base) = self.public_base_url {
            join_url(base, key)
        } else if let Some(ref endpoint) = self.endpoint_url {
            // Path-style works across S3-compatible providers: {endpoint}/{bucket}/{key}
            join_url(
                &format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
                key,
            )
        } else {
            join_url(
                &format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
                key,
            )
        }
    }

    fn attributes(content_type: &str, metadata: &ObjectMetadata) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        for (name, value) in metadata {
            attributes.insert(
                Attribute::Metadata(Cow::Owned(name.clone())),
                AttributeValue::from(value.clone()),
            );
        }
        attributes
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let location = Path::from(key.to_string());
        let opts = PutOptions {
            attributes: Self::attributes(content_type, metadata),
            ..Default::default()
        };

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), opts)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn put_object_stream(
        &self,
        key: &str,
        mut reader: ObjectReader,
        content_length: u64,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<u64> {
        let location = Path::from(key.to_string());
        let opts = PutMultipartOptions {
            attributes: Self::attributes(content_type, metadata),
            ..Default::default()
        };
        let start = std::time::Instant::now();

        let upload = self
            .store
            .put_multipart_opts(&location, opts)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 multipart upload could not be started"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        let mut writer = WriteMultipart::new_with_chunk_size(upload, PART_SIZE);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let mut written: u64 = 0;

        loop {
            let bytes_read = match reader.read(&mut buffer).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        size_bytes = written,
                        expected_bytes = content_length,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 stream upload aborted: read failed"
                    );
                    if let Err(abort_err) = writer.abort().await {
                        tracing::warn!(
                            error = %abort_err,
                            bucket = %self.bucket,
                            key = %key,
                            "Failed to abort S3 multipart upload"
                        );
                    }
                    return Err(StorageError::IoError(e));
                }
            };

            if bytes_read == 0 {
                break;
            }

            writer
                .wait_for_capacity(MAX_CONCURRENT_PARTS)
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
            writer.write(&buffer[..bytes_read]);
            written += bytes_read as u64;
        }

        writer.finish().await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = written,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 stream upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 stream upload successful"
        );

        Ok(written)
    }

    async fn presigned_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 presign failed"
                );
                StorageError::BackendError(e.to_string())
            })?
            .to_string();

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            expires_in_secs = expires_in.as_secs(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 presigned URL issued"
        );

        Ok(url)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.generate_url(key)
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage(endpoint: Option<&str>, public_base: Option<&str>) -> S3Storage {
        S3Storage::new(
            "podcasts".to_string(),
            "eu-west-1".to_string(),
            endpoint.map(String::from),
            public_base.map(String::from),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_public_url_aws() {
        let s3 = storage(None, None).await;
        assert_eq!(
            s3.public_url("t1/covers/a.png"),
            "https://podcasts.s3.eu-west-1.amazonaws.com/t1/covers/a.png"
        );
        assert_eq!(s3.bucket_name(), "podcasts");
        assert_eq!(s3.backend_type(), StorageBackend::S3);
    }

    #[tokio::test]
    async fn test_public_url_custom_endpoint() {
        let s3 = storage(Some("http://localhost:9000/"), None).await;
        assert_eq!(
            s3.public_url("t1/a.png"),
            "http://localhost:9000/podcasts/t1/a.png"
        );
    }

    #[tokio::test]
    async fn test_public_url_prefers_public_base() {
        let s3 = storage(Some("http://localhost:9000"), Some("https://cdn.example.com")).await;
        assert_eq!(s3.public_url("t1/a.png"), "https://cdn.example.com/t1/a.png");
    }
}
