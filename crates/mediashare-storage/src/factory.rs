#[cfg(feature = "storage-local")]
use crate::LocalBlobStore;
#[cfg(feature = "storage-s3")]
use crate::S3BlobStore;
use crate::{BlobError, BlobResult, BlobStore};
use mediashare_core::{Config, StorageBackendKind};
use std::sync::Arc;

/// Create a blob store backend based on configuration
pub async fn create_blob_store(config: &Config) -> BlobResult<Arc<dyn BlobStore>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        Some(StorageBackendKind::S3) => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| BlobError::Config("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region.clone().ok_or_else(|| {
                BlobError::Config("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            let endpoint = config.s3_endpoint.clone();

            let store = S3BlobStore::new(bucket, region, endpoint)?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-s3"))]
        Some(StorageBackendKind::S3) => Err(BlobError::Config(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        Some(StorageBackendKind::Local) => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                BlobError::Config("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = config.local_storage_base_url.clone().ok_or_else(|| {
                BlobError::Config("LOCAL_STORAGE_BASE_URL not configured".to_string())
            })?;

            let store = LocalBlobStore::new(base_path, base_url).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        Some(StorageBackendKind::Local) => Err(BlobError::Config(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        None => Err(BlobError::Config(
            "STORAGE_BACKEND not configured".to_string(),
        )),
    }
}
