//! Configuration module
//!
//! Gateway configuration loaded from the environment (and a `.env` file when
//! present): server, storage backend and upload policy settings.

use std::env;

use crate::constants::{
    DEFAULT_GRANT_EXPIRY_SECS, MAX_GRANT_EXPIRY_SECS, MIN_GRANT_EXPIRY_SECS,
    STREAMING_THRESHOLD_BYTES,
};
use crate::policy::{PolicyTable, SizeLimits};
use crate::storage_types::StorageBackend;

const MIB: u64 = 1024 * 1024;
const DEFAULT_PORT: u16 = 4000;
const MIN_SIGNING_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    /// `LOG_FORMAT=json` switches the fmt layer to JSON lines.
    pub log_json: bool,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, R2, etc.)
    pub s3_public_base_url: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub local_storage_signing_secret: Option<String>,
    // Upload configuration
    pub streaming_threshold_bytes: u64,
    pub size_limits: SizeLimits,
    pub default_grant_expiry_secs: u64,
}

fn parse_mb(lookup: &impl Fn(&str) -> Option<String>, name: &str, default_mb: u64) -> u64 {
    lookup(name)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_mb)
        .saturating_mul(MIB)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        const MAX_AUDIO_SIZE_MB: u64 = 500;
        const MAX_IMAGE_SIZE_MB: u64 = 20;
        const MAX_VIDEO_SIZE_MB: u64 = 2048;
        const MAX_DOCUMENT_SIZE_MB: u64 = 50;

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => DEFAULT_PORT,
        };

        let storage_backend = match non_empty(lookup("STORAGE_BACKEND")) {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let streaming_threshold_bytes = lookup("UPLOAD_STREAMING_THRESHOLD_MB")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|mb| mb.saturating_mul(MIB))
            .unwrap_or(STREAMING_THRESHOLD_BYTES);

        let size_limits = SizeLimits {
            audio: parse_mb(&lookup, "MAX_AUDIO_SIZE_MB", MAX_AUDIO_SIZE_MB),
            image: parse_mb(&lookup, "MAX_IMAGE_SIZE_MB", MAX_IMAGE_SIZE_MB),
            video: parse_mb(&lookup, "MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB),
            document: parse_mb(&lookup, "MAX_DOCUMENT_SIZE_MB", MAX_DOCUMENT_SIZE_MB),
        };

        let default_grant_expiry_secs = lookup("DEFAULT_GRANT_EXPIRY_SECONDS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_GRANT_EXPIRY_SECS)
            .clamp(MIN_GRANT_EXPIRY_SECS, MAX_GRANT_EXPIRY_SECS);

        let log_json = lookup("LOG_FORMAT")
            .map(|v| v.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            server_port,
            environment,
            cors_origins,
            log_json,
            storage_backend,
            s3_bucket: non_empty(lookup("S3_BUCKET")),
            s3_region: non_empty(lookup("S3_REGION")).or_else(|| non_empty(lookup("AWS_REGION"))),
            s3_endpoint: non_empty(lookup("S3_ENDPOINT")),
            s3_public_base_url: non_empty(lookup("S3_PUBLIC_BASE_URL")),
            local_storage_path: non_empty(lookup("LOCAL_STORAGE_PATH")),
            local_storage_base_url: non_empty(lookup("LOCAL_STORAGE_BASE_URL")),
            local_storage_signing_secret: non_empty(lookup("LOCAL_STORAGE_SIGNING_SECRET")),
            streaming_threshold_bytes,
            size_limits,
            default_grant_expiry_secs,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.streaming_threshold_bytes == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_STREAMING_THRESHOLD_MB must be greater than 0"
            ));
        }

        let limits = [
            ("MAX_AUDIO_SIZE_MB", self.size_limits.audio),
            ("MAX_IMAGE_SIZE_MB", self.size_limits.image),
            ("MAX_VIDEO_SIZE_MB", self.size_limits.video),
            ("MAX_DOCUMENT_SIZE_MB", self.size_limits.document),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, limit)| *limit == 0) {
            return Err(anyhow::anyhow!("{} must be greater than 0", name));
        }

        // Validate storage backend configuration
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
                match &self.local_storage_signing_secret {
                    Some(secret) if secret.len() >= MIN_SIGNING_SECRET_LEN => {}
                    _ => {
                        return Err(anyhow::anyhow!(
                            "LOCAL_STORAGE_SIGNING_SECRET must be at least {} characters long",
                            MIN_SIGNING_SECRET_LEN
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    // Convenience getters
    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn streaming_threshold_bytes(&self) -> u64 {
        self.streaming_threshold_bytes
    }

    pub fn default_grant_expiry_secs(&self) -> u64 {
        self.default_grant_expiry_secs
    }

    /// Immutable category policy table with the configured size ceilings.
    pub fn policy_table(&self) -> PolicyTable {
        PolicyTable::with_limits(self.size_limits)
    }
}
