use crate::traits::{
    BlobEntry, BlobError, BlobResult, BlobStore, BlobStream, ProgressFn,
    CHUNKED_UPLOAD_THRESHOLD, UPLOAD_CHUNK_SIZE,
};
use async_trait::async_trait;
use bytes::Bytes;
use mediashare_core::MediaType;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem blob store
///
/// Containers are directories under the base path. Used for development and
/// tests; behavior matches the S3 backend, including delete-of-absent
/// returning `Ok(false)` and chunked writes with progress.
#[derive(Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    /// Create a new LocalBlobStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for blob storage
    /// * `base_url` - Base URL files are served under (e.g., "http://localhost:3000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> BlobResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            BlobError::Config(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalBlobStore {
            base_path,
            base_url,
        })
    }

    /// Convert a container + blob name to a filesystem path, rejecting names
    /// that would escape the base directory.
    fn blob_path(&self, container: &str, blob_name: &str) -> BlobResult<PathBuf> {
        if blob_name.is_empty() || blob_name.contains("..") || blob_name.starts_with('/') {
            return Err(BlobError::InvalidName(blob_name.to_string()));
        }
        if container.contains("..") || container.contains('/') {
            return Err(BlobError::InvalidName(container.to_string()));
        }

        Ok(self.base_path.join(container).join(blob_name))
    }

    fn generate_url(&self, container: &str, blob_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            container,
            urlencoding::encode(blob_name)
        )
    }

    async fn ensure_parent_dir(&self, path: &Path) -> BlobResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_containers(&self) -> BlobResult<()> {
        for media_type in MediaType::ALL {
            let dir = self.base_path.join(media_type.container_name());
            fs::create_dir_all(&dir).await.map_err(|e| {
                BlobError::Config(format!(
                    "Failed to create container directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        tracing::info!(base_path = %self.base_path.display(), "local containers verified");
        Ok(())
    }

    async fn upload(
        &self,
        container: &str,
        blob_name: &str,
        _content_type: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> BlobResult<String> {
        let path = self.blob_path(container, blob_name)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            BlobError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        if size as u64 > CHUNKED_UPLOAD_THRESHOLD {
            let total_chunks = size.div_ceil(UPLOAD_CHUNK_SIZE);
            for (index, chunk) in data.chunks(UPLOAD_CHUNK_SIZE).enumerate() {
                file.write_all(chunk).await.map_err(|e| {
                    BlobError::UploadFailed(format!(
                        "Failed to write file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                if let Some(callback) = &progress {
                    callback((((index + 1) * 100) / total_chunks) as u8);
                }
            }
        } else {
            file.write_all(&data).await.map_err(|e| {
                BlobError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
            })?;
            if let Some(callback) = &progress {
                callback(100);
            }
        }

        file.sync_all().await.map_err(|e| {
            BlobError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.generate_url(container, blob_name);

        tracing::info!(
            path = %path.display(),
            container = container,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "local upload successful"
        );

        Ok(url)
    }

    async fn delete(&self, container: &str, blob_name: &str) -> BlobResult<bool> {
        let path = self.blob_path(container, blob_name)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), "blob already absent");
            return Ok(false);
        }

        fs::remove_file(&path).await.map_err(|e| {
            BlobError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            container = container,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "local delete successful"
        );

        Ok(true)
    }

    async fn list(&self, container: &str) -> BlobResult<BlobStream> {
        let dir = self.base_path.join(container);

        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(Box::pin(futures::stream::empty()));
        }

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&dir).await.map_err(|e| {
            BlobError::ListFailed(format!("Failed to read {}: {}", dir.display(), e))
        })?;

        while let Some(entry) = read_dir.next_entry().await.map_err(|e| {
            BlobError::ListFailed(format!("Failed to read {}: {}", dir.display(), e))
        })? {
            if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let url = self.generate_url(container, &name);
            entries.push(Ok(BlobEntry { name, url }));
        }

        // Directory scans are cheap enough to collect eagerly; the stream
        // interface matches the S3 backend.
        Ok(Box::pin(futures::stream::iter(entries)))
    }

    fn blob_url(&self, container: &str, blob_name: &str) -> String {
        self.generate_url(container, blob_name)
    }

    async fn signed_url(
        &self,
        container: &str,
        blob_name: &str,
        _expires_in: Duration,
    ) -> BlobResult<String> {
        self.blob_path(container, blob_name)?;
        Ok(self.generate_url(container, blob_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    const BASE_URL: &str = "http://localhost:3000/media";

    async fn test_store(dir: &tempfile::TempDir) -> LocalBlobStore {
        LocalBlobStore::new(dir.path(), BASE_URL.to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_list() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        let url = store
            .upload(
                "myimages",
                "1700-cat.jpg",
                "image/jpeg",
                Bytes::from_static(b"jpeg bytes"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(url, format!("{}/myimages/1700-cat.jpg", BASE_URL));

        let mut listing = store.list("myimages").await.unwrap();
        let entry = listing.next().await.unwrap().unwrap();
        assert_eq!(entry.name, "1700-cat.jpg");
        assert_eq!(entry.url, url);
        assert!(listing.next().await.is_none());
    }

    #[tokio::test]
    async fn test_delete_absent_blob_returns_false() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        assert!(!store.delete("myimages", "never-existed.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_existing_blob_returns_true() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        store
            .upload(
                "myaudio",
                "1700-song.mp3",
                "audio/mpeg",
                Bytes::from_static(b"mp3"),
                None,
            )
            .await
            .unwrap();

        assert!(store.delete("myaudio", "1700-song.mp3").await.unwrap());
        assert!(!store.delete("myaudio", "1700-song.mp3").await.unwrap());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        let result = store.delete("myimages", "../../etc/passwd").await;
        assert!(matches!(result, Err(BlobError::InvalidName(_))));

        let result = store
            .upload(
                "myimages",
                "/absolute.jpg",
                "image/jpeg",
                Bytes::from_static(b"x"),
                None,
            )
            .await;
        assert!(matches!(result, Err(BlobError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_list_missing_container_is_empty() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        let mut listing = store.list("myvideos").await.unwrap();
        assert!(listing.next().await.is_none());
    }

    #[tokio::test]
    async fn test_ensure_containers_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        store.ensure_containers().await.unwrap();
        store.ensure_containers().await.unwrap();

        for media_type in MediaType::ALL {
            assert!(dir.path().join(media_type.container_name()).is_dir());
        }
    }

    #[tokio::test]
    async fn test_chunked_upload_reports_progress() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        // Just over the chunking threshold: 21 MiB -> 6 chunks of 4 MiB.
        let data = Bytes::from(vec![7u8; 21 * 1024 * 1024]);
        let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |pct| sink.lock().unwrap().push(pct));

        store
            .upload(
                "myvideos",
                "1700-clip.mp4",
                "video/mp4",
                data.clone(),
                Some(progress),
            )
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 6);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*seen.last().unwrap(), 100);

        let written = std::fs::read(dir.path().join("myvideos/1700-clip.mp4")).unwrap();
        assert_eq!(written.len(), data.len());
    }

    #[tokio::test]
    async fn test_small_upload_reports_single_completion() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |pct| sink.lock().unwrap().push(pct));

        store
            .upload(
                "myimages",
                "1700-dot.png",
                "image/png",
                Bytes::from_static(b"png"),
                Some(progress),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn test_url_encodes_blob_name() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;
        assert_eq!(
            store.blob_url("myimages", "1700-my cat.jpg"),
            format!("{}/myimages/1700-my%20cat.jpg", BASE_URL)
        );
    }
}
