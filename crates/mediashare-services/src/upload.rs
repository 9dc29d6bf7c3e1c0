//! Upload pipeline
//!
//! Validate locally, write the blob, then mirror a metadata record into the
//! index. The blob write and the index write share no transaction; a failed
//! index write leaves the blob in place and reports the error.

use bytes::Bytes;
use chrono::Utc;
use mediashare_core::{AppError, MediaRecord, NotificationBus, UploadPolicy};
use mediashare_db::MediaRepository;
use mediashare_storage::{BlobStore, ProgressFn};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// One file handed in by the caller.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

pub struct UploadService {
    repository: Arc<MediaRepository>,
    blobs: Arc<dyn BlobStore>,
    policy: UploadPolicy,
    bus: NotificationBus,
    containers_ready: OnceCell<()>,
}

impl UploadService {
    pub fn new(
        repository: Arc<MediaRepository>,
        blobs: Arc<dyn BlobStore>,
        policy: UploadPolicy,
        bus: NotificationBus,
    ) -> Self {
        Self {
            repository,
            blobs,
            policy,
            bus,
            containers_ready: OnceCell::new(),
        }
    }

    /// Upload a file and index it. Returns the stored record.
    pub async fn upload(
        &self,
        request: UploadRequest,
        progress: Option<ProgressFn>,
    ) -> Result<MediaRecord, AppError> {
        let media_type = self
            .policy
            .validate(&request.content_type, request.data.len() as u64)
            .map_err(|e| {
                self.bus.error(e.to_string());
                AppError::from(e)
            })?;

        // Container bootstrap runs once per process; a failed attempt is
        // retried on the next upload.
        self.containers_ready
            .get_or_try_init(|| async { self.blobs.ensure_containers().await })
            .await
            .map_err(|e| {
                let err = AppError::from(e);
                self.bus.error(err.client_message());
                err
            })?;

        let timestamp = Utc::now().timestamp_millis();
        let blob_name = format!("{}-{}", timestamp, request.file_name);
        let container = media_type.container_name();

        tracing::info!(
            file_name = %request.file_name,
            content_type = %request.content_type,
            size_bytes = request.data.len(),
            container,
            "uploading file"
        );

        let url = match self
            .blobs
            .upload(
                container,
                &blob_name,
                &request.content_type,
                request.data.clone(),
                progress,
            )
            .await
        {
            Ok(url) => url,
            Err(e) => {
                let err = AppError::from(e);
                self.bus.error(format!(
                    "Failed to upload {}. {}",
                    request.file_name,
                    err.client_message()
                ));
                return Err(err);
            }
        };

        let record = MediaRecord {
            id: format!("{}-{}", timestamp, sanitize_file_name(&request.file_name)),
            media_type: Some(media_type.as_str().to_string()),
            file_name: Some(request.file_name.clone()),
            blob_name: Some(blob_name.clone()),
            blob_url: Some(url),
            content_type: Some(request.content_type.clone()),
            container_name: Some(container.to_string()),
            upload_date: Some(Utc::now()),
            file_size: Some(request.data.len() as u64),
            title: Some(file_stem(&request.file_name)),
            description: Some(String::new()),
            tags: Vec::new(),
            name: None,
            partition_key: None, // stamped by the repository
            extra: Default::default(),
        };

        let stored = match self.repository.create(record).await {
            Ok(stored) => stored,
            Err(e) => {
                // No rollback across stores: the blob stays, orphaned until
                // a retry or manual cleanup.
                tracing::error!(
                    error = %e,
                    blob_name = %blob_name,
                    container,
                    "index write failed after blob upload; storage object left in place"
                );
                let err = AppError::from(e);
                self.bus.error(format!(
                    "{} was stored, but its record could not be saved: {}",
                    request.file_name,
                    err.client_message()
                ));
                return Err(err);
            }
        };

        self.bus
            .success(format!("{} uploaded successfully.", request.file_name));
        Ok(stored)
    }
}

/// Strip everything but ASCII alphanumerics, for use inside record ids.
fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// File name without its extension, used as the default title.
fn file_stem(file_name: &str) -> String {
    file_name
        .split('.')
        .next()
        .unwrap_or(file_name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediashare_core::{MediaType, TypeFilter, ValidationError};
    use mediashare_db::MemoryBackend;
    use mediashare_storage::LocalBlobStore;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct Fixture {
        service: UploadService,
        repository: Arc<MediaRepository>,
        blobs: Arc<dyn BlobStore>,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let blobs: Arc<dyn BlobStore> = Arc::new(
            LocalBlobStore::new(dir.path(), "http://localhost:3000/media".to_string())
                .await
                .unwrap(),
        );
        let repository = Arc::new(MediaRepository::new(Arc::new(MemoryBackend::new())));
        let service = UploadService::new(
            repository.clone(),
            blobs.clone(),
            UploadPolicy::default(),
            NotificationBus::default(),
        );
        Fixture {
            service,
            repository,
            blobs,
            _dir: dir,
        }
    }

    fn png_request(file_name: &str) -> UploadRequest {
        UploadRequest {
            file_name: file_name.to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from_static(b"png bytes"),
        }
    }

    #[tokio::test]
    async fn test_upload_stores_blob_and_record() {
        let f = fixture().await;

        let stored = f.service.upload(png_request("cat photo.png"), None).await.unwrap();

        assert_eq!(stored.media_type.as_deref(), Some("image"));
        assert_eq!(stored.container_name.as_deref(), Some("myimages"));
        assert_eq!(stored.file_name.as_deref(), Some("cat photo.png"));
        assert_eq!(stored.title.as_deref(), Some("cat photo"));
        assert_eq!(stored.file_size, Some(9));
        assert_eq!(stored.partition_key.as_deref(), Some("image"));

        // Blob name is <timestamp>-<original name>, preserved verbatim.
        let blob_name = stored.blob_name.as_deref().unwrap();
        let (prefix, rest) = blob_name.split_once('-').unwrap();
        assert!(prefix.parse::<i64>().is_ok());
        assert_eq!(rest, "cat photo.png");

        // The id carries the sanitized name instead.
        assert!(stored.id.ends_with("catphotopng"));

        // And the blob is really there.
        let listed = f
            .repository
            .get_by_type(&TypeFilter::Only(MediaType::Image))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(f.blobs.delete("myimages", blob_name).await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_format_before_any_write() {
        let f = fixture().await;

        let result = f
            .service
            .upload(
                UploadRequest {
                    file_name: "scan.tiff".to_string(),
                    content_type: "image/tiff".to_string(),
                    data: Bytes::from_static(b"tiff"),
                },
                None,
            )
            .await;

        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::UnsupportedFormat { .. }))
        ));
        let listed = f.repository.get_all().await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_file_naming_sizes() {
        let f = fixture().await;

        let oversized = UploadRequest {
            file_name: "big.png".to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from(vec![0u8; (20 * 1024 * 1024) + 1]),
        };
        let err = f.service.upload(oversized, None).await.unwrap_err();
        let message = err.client_message();
        assert!(message.contains("20971521"));
        assert!(message.contains("20971520"));
    }

    #[tokio::test]
    async fn test_upload_reports_progress() {
        let f = fixture().await;

        let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |pct| sink.lock().unwrap().push(pct));

        f.service
            .upload(png_request("dot.png"), Some(progress))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn test_repeated_upload_of_same_file_creates_distinct_blobs() {
        let f = fixture().await;

        f.service.upload(png_request("cat.png"), None).await.unwrap();
        // File names may collide across uploads; blob names must not.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        f.service.upload(png_request("cat.png"), None).await.unwrap();

        let listed = f.repository.get_all().await.unwrap();
        let blob_names: std::collections::HashSet<_> =
            listed.iter().filter_map(|r| r.blob_name.clone()).collect();
        assert_eq!(blob_names.len(), listed.len());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("my cat (1).jpg"), "mycat1jpg");
        assert_eq!(sanitize_file_name("clip.mp4"), "clipmp4");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("song.mp3"), "song");
        assert_eq!(file_stem("noext"), "noext");
    }
}
