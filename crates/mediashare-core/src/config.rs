//! Configuration module
//!
//! Environment-driven configuration for the blob store and the metadata
//! index. Construction is lenient (missing values stay `None`); `validate`
//! collapses everything missing into a single "not configured" condition so
//! callers can short-circuit and show one banner.

use std::env;

use crate::error::AppError;
use crate::validation::{
    UploadPolicy, DEFAULT_MAX_MEDIA_SIZE_BYTES, DEFAULT_MAX_VIDEO_SIZE_BYTES,
};

/// Which blob store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackendKind {
    S3,
    Local,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub storage_backend: Option<StorageBackendKind>,
    // S3-compatible backend
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces, ...).
    pub s3_endpoint: Option<String>,
    // Local filesystem backend
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Metadata index
    pub database_url: Option<String>,
    // Upload limits
    pub max_media_size_bytes: u64,
    pub max_video_size_bytes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => match value.to_lowercase().as_str() {
                "s3" => Some(StorageBackendKind::S3),
                "local" => Some(StorageBackendKind::Local),
                other => {
                    return Err(anyhow::anyhow!(
                        "STORAGE_BACKEND must be 's3' or 'local', got '{other}'"
                    ))
                }
            },
            Err(_) => None,
        };

        let max_media_size_bytes = env::var("MAX_MEDIA_SIZE_MB")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|mb| mb * 1024 * 1024)
            .unwrap_or(DEFAULT_MAX_MEDIA_SIZE_BYTES);

        let max_video_size_bytes = env::var("MAX_VIDEO_SIZE_MB")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|mb| mb * 1024 * 1024)
            .unwrap_or(DEFAULT_MAX_VIDEO_SIZE_BYTES);

        Ok(Config {
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or(env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            database_url: env::var("DATABASE_URL").ok(),
            max_media_size_bytes,
            max_video_size_bytes,
        })
    }

    /// Check that every variable the selected backend needs is present.
    ///
    /// Returns one [`AppError::NotConfigured`] naming all missing variables.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut missing: Vec<&str> = Vec::new();

        match self.storage_backend {
            None => missing.push("STORAGE_BACKEND"),
            Some(StorageBackendKind::S3) => {
                if self.s3_bucket.is_none() {
                    missing.push("S3_BUCKET");
                }
                if self.s3_region.is_none() {
                    missing.push("S3_REGION");
                }
            }
            Some(StorageBackendKind::Local) => {
                if self.local_storage_path.is_none() {
                    missing.push("LOCAL_STORAGE_PATH");
                }
                if self.local_storage_base_url.is_none() {
                    missing.push("LOCAL_STORAGE_BASE_URL");
                }
            }
        }

        if self.database_url.is_none() {
            missing.push("DATABASE_URL");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::NotConfigured(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.max_media_size_bytes, self.max_video_size_bytes)
    }
}
