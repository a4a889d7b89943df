use crate::traits::{ObjectMetadata, ObjectReader, Storage, StorageError, StorageResult};
use crate::url::join_url;
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

type HmacSha256 = Hmac<Sha256>;

const COPY_BUFFER_SIZE: usize = 64 * 1024;
/// Reported in place of a bucket; the filesystem root stays private.
const BUCKET_NAME: &str = "local";

/// Local filesystem storage implementation
///
/// Signed URLs take the form `{base_url}/{key}?expires={unix_ts}&signature={hex}`
/// where the signature is HMAC-SHA256 over `"{key}\n{expires}"`. Whatever
/// serves `base_url` checks them with [`LocalStorage::verify_signature`].
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    signing_secret: Vec<u8>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/podstore")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:4000/media")
    /// * `signing_secret` - Key for signed URLs
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signing_secret: impl Into<Vec<u8>>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();
        let signing_secret = signing_secret.into();

        if signing_secret.is_empty() {
            return Err(StorageError::ConfigError(
                "Local storage signing secret must not be empty".to_string(),
            ));
        }

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            signing_secret,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys with traversal sequences or an absolute path, then makes
    /// sure whatever exists of the path resolves inside the base directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        // Nearest existing ancestor must stay inside the base (symlinks included)
        let mut existing = path.as_path();
        while !existing.exists() {
            match existing.parent() {
                Some(parent) => existing = parent,
                None => break,
            }
        }
        if let Ok(canonical) = existing.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn mac(&self, key: &str, expires: i64) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.signing_secret).expect("HMAC accepts any key size");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    fn sign(&self, key: &str, expires: i64) -> String {
        hex::encode(self.mac(key, expires).finalize().into_bytes())
    }

    /// Check a signature produced by [`Storage::presigned_url`].
    ///
    /// Fails for tampered keys or expiries, bad hex, and expired links.
    pub fn verify_signature(&self, key: &str, expires: i64, signature: &str) -> bool {
        if Utc::now().timestamp() > expires {
            return false;
        }
        let Ok(tag) = hex::decode(signature) else {
            return false;
        };
        self.mac(key, expires).verify_slice(&tag).is_ok()
    }

    async fn write_metadata(&self, path: &Path, content_type: &str, metadata: &ObjectMetadata) {
        // Sidecar is informational; losing it does not lose the object.
        let mut sidecar = format!("content-type: {}\n", content_type);
        for (name, value) in metadata {
            sidecar.push_str(&format!("{}: {}\n", name, value.replace('\n', " ")));
        }
        let sidecar_path = Self::metadata_path(path);
        if let Err(e) = fs::write(&sidecar_path, sidecar).await {
            tracing::warn!(
                path = %sidecar_path.display(),
                error = %e,
                "Failed to write object metadata sidecar"
            );
        }
    }

    fn metadata_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".meta");
        PathBuf::from(name)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        self.write_metadata(&path, content_type, metadata).await;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn put_object_stream(
        &self,
        key: &str,
        mut reader: ObjectReader,
        _content_length: u64,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut bytes_copied: u64 = 0;
        loop {
            let step = match reader.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => file
                    .write_all(&buffer[..n])
                    .await
                    .map(|_| n)
                    .map_err(|e| {
                        StorageError::UploadFailed(format!(
                            "Failed to write stream to file {}: {}",
                            path.display(),
                            e
                        ))
                    }),
                Err(e) => Err(StorageError::IoError(e)),
            };

            match step {
                Ok(n) => bytes_copied += n as u64,
                Err(err) => {
                    drop(file);
                    // Never leave a truncated object behind under a valid key
                    let _ = fs::remove_file(&path).await;
                    tracing::error!(
                        path = %path.display(),
                        key = %key,
                        error = %err,
                        size_bytes = bytes_copied,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Local storage stream upload failed"
                    );
                    return Err(err);
                }
            }
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        self.write_metadata(&path, content_type, metadata).await;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(bytes_copied)
    }

    async fn presigned_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        self.key_to_path(key)?;

        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        let signature = self.sign(key, expires);

        tracing::debug!(
            key = %key,
            expires_in_secs = expires_in.as_secs(),
            "Local storage signed URL issued"
        );

        Ok(format!(
            "{}?expires={}&signature={}",
            self.generate_url(key),
            expires,
            signature
        ))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;
        let _ = fs::remove_file(Self::metadata_path(&path)).await;

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.generate_url(key)
    }

    fn bucket_name(&self) -> &str {
        BUCKET_NAME
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
