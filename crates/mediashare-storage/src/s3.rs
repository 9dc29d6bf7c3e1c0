use crate::traits::{
    BlobEntry, BlobError, BlobResult, BlobStore, BlobStream, ProgressFn,
    CHUNKED_UPLOAD_THRESHOLD, UPLOAD_CHUNK_SIZE,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::Method;
use mediashare_core::MediaType;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload, WriteMultipart,
};
use std::time::Duration;

/// Maximum chunk uploads in flight while staging a large file.
const MAX_CONCURRENT_CHUNKS: usize = 8;

/// S3-compatible blob store
///
/// Containers are key prefixes inside a single bucket: blob `b` in container
/// `c` lives at key `c/b`.
#[derive(Clone)]
pub struct S3BlobStore {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3BlobStore {
    /// Create a new S3BlobStore instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(bucket: String, region: String, endpoint_url: Option<String>) -> BlobResult<Self> {
        // Build AmazonS3 object store from environment and explicit settings.
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
            .map_err(|e| BlobError::Config(e.to_string()))?;

        Ok(S3BlobStore {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    fn object_path(container: &str, blob_name: &str) -> BlobResult<Path> {
        validate_blob_name(blob_name)?;
        Ok(Path::from(format!("{}/{}", container, blob_name)))
    }

    /// Generate the public URL for a blob
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, path-style with the endpoint URL
    fn generate_url(&self, container: &str, blob_name: &str) -> String {
        let encoded = urlencoding::encode(blob_name);
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}/{}", base_url, self.bucket, container, encoded)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}/{}",
                self.bucket, self.region, container, encoded
            )
        }
    }

    async fn stage_chunks(
        writer: &mut WriteMultipart,
        data: &Bytes,
        progress: Option<&ProgressFn>,
    ) -> Result<(), ObjectStoreError> {
        let total_chunks = data.len().div_ceil(UPLOAD_CHUNK_SIZE);
        for (index, chunk) in data.chunks(UPLOAD_CHUNK_SIZE).enumerate() {
            writer.wait_for_capacity(MAX_CONCURRENT_CHUNKS).await?;
            writer.write(chunk);
            if let Some(callback) = progress {
                callback((((index + 1) * 100) / total_chunks) as u8);
            }
        }
        Ok(())
    }
}

/// Blob names must not traverse outside their container prefix.
fn validate_blob_name(blob_name: &str) -> BlobResult<()> {
    if blob_name.is_empty() || blob_name.contains("..") || blob_name.starts_with('/') {
        return Err(BlobError::InvalidName(blob_name.to_string()));
    }
    Ok(())
}

fn map_store_error(
    err: ObjectStoreError,
    blob_name: &str,
    fallback: fn(String) -> BlobError,
) -> BlobError {
    match err {
        ObjectStoreError::NotFound { .. } => BlobError::NotFound(blob_name.to_string()),
        e @ (ObjectStoreError::PermissionDenied { .. }
        | ObjectStoreError::Unauthenticated { .. }) => BlobError::PermissionDenied(e.to_string()),
        other => fallback(other.to_string()),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn ensure_containers(&self) -> BlobResult<()> {
        // Key prefixes need no creation; probe each one so configuration and
        // permission problems surface before the first real operation.
        for media_type in MediaType::ALL {
            let prefix = Path::from(media_type.container_name());
            let mut listing = self.store.list(Some(&prefix));
            if let Some(Err(e)) = listing.next().await {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    container = media_type.container_name(),
                    "S3 container probe failed"
                );
                return Err(map_store_error(
                    e,
                    media_type.container_name(),
                    BlobError::Backend,
                ));
            }
        }

        tracing::info!(bucket = %self.bucket, "S3 containers verified");
        Ok(())
    }

    async fn upload(
        &self,
        container: &str,
        blob_name: &str,
        content_type: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> BlobResult<String> {
        let location = Self::object_path(container, blob_name)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        if size > CHUNKED_UPLOAD_THRESHOLD {
            // Stage fixed-size chunks and commit them as a unit.
            let multipart = self
                .store
                .put_multipart(&location)
                .await
                .map_err(|e| map_store_error(e, blob_name, BlobError::UploadFailed))?;
            let mut writer = WriteMultipart::new_with_chunk_size(multipart, UPLOAD_CHUNK_SIZE);

            if let Err(e) = Self::stage_chunks(&mut writer, &data, progress.as_ref()).await {
                writer.abort().await.ok();
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %location,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 chunked upload failed"
                );
                return Err(map_store_error(e, blob_name, BlobError::UploadFailed));
            }

            writer
                .finish()
                .await
                .map_err(|e| map_store_error(e, blob_name, BlobError::UploadFailed))?;
        } else {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());

            self.store
                .put_opts(&location, PutPayload::from(data), PutOptions::from(attributes))
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %location,
                        size_bytes = size,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 upload failed"
                    );
                    map_store_error(e, blob_name, BlobError::UploadFailed)
                })?;

            if let Some(callback) = &progress {
                callback(100);
            }
        }

        let url = self.generate_url(container, blob_name);

        tracing::info!(
            bucket = %self.bucket,
            key = %location,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(url)
    }

    async fn delete(&self, container: &str, blob_name: &str) -> BlobResult<bool> {
        let location = Self::object_path(container, blob_name)?;
        let start = std::time::Instant::now();

        match self.store.delete(&location).await {
            Ok(()) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %location,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete successful"
                );
                Ok(true)
            }
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(
                    bucket = %self.bucket,
                    key = %location,
                    "S3 blob already absent"
                );
                Ok(false)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %location,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                Err(map_store_error(e, blob_name, BlobError::DeleteFailed))
            }
        }
    }

    async fn list(&self, container: &str) -> BlobResult<BlobStream> {
        let prefix = Path::from(container);
        let container = container.to_string();
        let this = self.clone();

        let stream = self.store.list(Some(&prefix)).map(move |item| match item {
            Ok(meta) => {
                let full: &str = meta.location.as_ref();
                let name = full
                    .strip_prefix(&format!("{}/", container))
                    .unwrap_or(full)
                    .to_string();
                let url = this.generate_url(&container, &name);
                Ok(BlobEntry { name, url })
            }
            Err(e) => Err(map_store_error(e, &container, BlobError::ListFailed)),
        });

        Ok(Box::pin(stream))
    }

    fn blob_url(&self, container: &str, blob_name: &str) -> String {
        self.generate_url(container, blob_name)
    }

    async fn signed_url(
        &self,
        container: &str,
        blob_name: &str,
        expires_in: Duration,
    ) -> BlobResult<String> {
        let location = Self::object_path(container, blob_name)?;
        let url = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await
            .map_err(|e| BlobError::Backend(e.to_string()))?;

        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_url_aws_format() {
        let store = S3BlobStore::new(
            "media".to_string(),
            "us-east-1".to_string(),
            None,
        )
        .unwrap();
        assert_eq!(
            store.generate_url("myimages", "1700-cat.jpg"),
            "https://media.s3.us-east-1.amazonaws.com/myimages/1700-cat.jpg"
        );
    }

    #[test]
    fn test_generate_url_custom_endpoint_is_path_style() {
        let store = S3BlobStore::new(
            "media".to_string(),
            "us-east-1".to_string(),
            Some("http://localhost:9000/".to_string()),
        )
        .unwrap();
        assert_eq!(
            store.generate_url("myaudio", "1700-song.mp3"),
            "http://localhost:9000/media/myaudio/1700-song.mp3"
        );
    }

    #[test]
    fn test_generate_url_encodes_blob_name() {
        let store = S3BlobStore::new("media".to_string(), "us-east-1".to_string(), None).unwrap();
        let url = store.generate_url("myimages", "1700-my cat.jpg");
        assert!(url.ends_with("myimages/1700-my%20cat.jpg"));
    }

    #[test]
    fn test_traversal_names_rejected() {
        assert!(matches!(
            S3BlobStore::object_path("myimages", "../escape.jpg"),
            Err(BlobError::InvalidName(_))
        ));
        assert!(matches!(
            S3BlobStore::object_path("myimages", "/absolute.jpg"),
            Err(BlobError::InvalidName(_))
        ));
    }
}
