//! Read-path reconciliation
//!
//! Produces one authoritative listing from two independently-updatable
//! sources. The metadata index is primary; when it is empty or unreachable,
//! the listing is synthesized from direct blob-container enumeration. The
//! merge rules are pure functions so the precedence order and tie-breaks are
//! testable without either store.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use mediashare_core::{AppError, MediaRecord, MediaType, TypeFilter};
use mediashare_db::MediaRepository;
use mediashare_storage::{BlobEntry, BlobStore};
use std::sync::Arc;

/// Deduplicate records by a key derived from `fileName`, falling back to
/// `blobUrl`, then `id`.
///
/// First-seen wins, except that a later duplicate carrying a populated URL
/// replaces a first-seen entry that lacks one (the richer record survives).
/// Ordering of survivors is preserved.
pub fn dedupe_records(records: Vec<MediaRecord>) -> Vec<MediaRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: std::collections::HashMap<String, MediaRecord> = std::collections::HashMap::new();

    for record in records {
        let key = dedup_key(&record);
        match by_key.get(&key) {
            None => {
                order.push(key.clone());
                by_key.insert(key, record);
            }
            Some(existing) => {
                let existing_has_url = !existing.blob_url.as_deref().unwrap_or("").is_empty();
                let candidate_has_url = !record.blob_url.as_deref().unwrap_or("").is_empty();
                if !existing_has_url && candidate_has_url {
                    by_key.insert(key, record);
                }
            }
        }
    }

    order.into_iter().filter_map(|k| by_key.remove(&k)).collect()
}

fn dedup_key(record: &MediaRecord) -> String {
    if let Some(file_name) = record.file_name.as_deref().filter(|s| !s.is_empty()) {
        return file_name.to_string();
    }
    if let Some(blob_url) = record.blob_url.as_deref().filter(|s| !s.is_empty()) {
        return blob_url.to_string();
    }
    record.id.clone()
}

/// Build minimal records from a raw blob listing.
///
/// True creation time is unavailable without extra calls, so every record
/// gets the supplied `now`; a later newest-first sort is stable, which keeps
/// blob-enumeration order.
pub fn synthesize_from_blobs(
    media_type: MediaType,
    entries: &[BlobEntry],
    now: DateTime<Utc>,
) -> Vec<MediaRecord> {
    entries
        .iter()
        .map(|entry| {
            let title = entry.name.split('.').next().unwrap_or(&entry.name);
            let content_type = entry
                .name
                .rsplit('.')
                .next()
                .filter(|ext| *ext != entry.name)
                .map(|ext| format!("{}/{}", media_type.as_str(), ext.to_lowercase()));

            MediaRecord {
                id: format!("{}-{}", media_type.as_str(), entry.name),
                media_type: Some(media_type.as_str().to_string()),
                file_name: None,
                blob_name: Some(entry.name.clone()),
                blob_url: Some(entry.url.clone()),
                content_type,
                container_name: Some(media_type.container_name().to_string()),
                upload_date: Some(now),
                file_size: None,
                title: Some(title.to_string()),
                description: Some(String::new()),
                tags: Vec::new(),
                name: Some(entry.name.clone()),
                partition_key: None,
                extra: Default::default(),
            }
        })
        .collect()
}

/// Type-filtered listings reconciled across the two stores.
pub struct GalleryReader {
    repository: Arc<MediaRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl GalleryReader {
    pub fn new(repository: Arc<MediaRepository>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { repository, blobs }
    }

    /// List records for the given filter.
    ///
    /// Index records win when any exist; an empty or erroring index falls
    /// back to enumerating the blob containers directly.
    pub async fn list(&self, filter: &TypeFilter) -> Result<Vec<MediaRecord>, AppError> {
        if let TypeFilter::Unknown(value) = filter {
            tracing::debug!(media_type = %value, "unknown type filter, returning empty listing");
            return Ok(Vec::new());
        }

        match self.repository.get_by_type(filter).await {
            Ok(records) if !records.is_empty() => return Ok(dedupe_records(records)),
            Ok(_) => {
                tracing::debug!("metadata index empty, falling back to blob enumeration");
            }
            Err(e) => {
                tracing::warn!(error = %e, "metadata index unavailable, falling back to blob enumeration");
            }
        }

        self.list_from_blobs(filter).await
    }

    /// Fallback path: list every blob in every container and synthesize
    /// records, keeping only the requested type when the filter names one.
    async fn list_from_blobs(&self, filter: &TypeFilter) -> Result<Vec<MediaRecord>, AppError> {
        let now = Utc::now();
        let mut synthesized = Vec::new();

        for media_type in MediaType::ALL {
            let container = media_type.container_name();
            let mut listing = match self.blobs.list(container).await {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::warn!(container, error = %e, "container listing failed, skipping");
                    continue;
                }
            };

            let mut entries = Vec::new();
            while let Some(item) = listing.next().await {
                match item {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        tracing::warn!(container, error = %e, "listing interrupted");
                        break;
                    }
                }
            }

            synthesized.extend(synthesize_from_blobs(media_type, &entries, now));
        }

        if let TypeFilter::Only(media_type) = filter {
            synthesized.retain(|r| r.normalized_type() == Some(*media_type));
        }
        synthesized.sort_by(|a, b| b.sort_date().cmp(&a.sort_date()));

        tracing::info!(count = synthesized.len(), "listing synthesized from blob storage");
        Ok(synthesized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: serde_json::Value) -> MediaRecord {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_dedup_prefers_later_record_with_url() {
        let without_url = record(serde_json::json!({
            "id": "1", "fileName": "a.png", "blobUrl": "",
        }));
        let with_url = record(serde_json::json!({
            "id": "2", "fileName": "a.png", "blobUrl": "https://x/a.png",
        }));

        let result = dedupe_records(vec![without_url, with_url]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].blob_url.as_deref(), Some("https://x/a.png"));
    }

    #[test]
    fn test_dedup_first_seen_wins_otherwise() {
        let first = record(serde_json::json!({
            "id": "1", "fileName": "a.png", "blobUrl": "https://x/a1.png",
        }));
        let second = record(serde_json::json!({
            "id": "2", "fileName": "a.png", "blobUrl": "https://x/a2.png",
        }));

        let result = dedupe_records(vec![first, second]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "1");
    }

    #[test]
    fn test_dedup_key_falls_back_to_url_then_id() {
        let by_url_a = record(serde_json::json!({"id": "1", "blobUrl": "https://x/a"}));
        let by_url_b = record(serde_json::json!({"id": "2", "blobUrl": "https://x/a"}));
        let by_id = record(serde_json::json!({"id": "3"}));

        let result = dedupe_records(vec![by_url_a, by_url_b, by_id]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "1");
        assert_eq!(result[1].id, "3");
    }

    #[test]
    fn test_dedup_preserves_order_of_survivors() {
        let records = vec![
            record(serde_json::json!({"id": "1", "fileName": "a.png"})),
            record(serde_json::json!({"id": "2", "fileName": "b.png"})),
            record(serde_json::json!({"id": "3", "fileName": "a.png"})),
            record(serde_json::json!({"id": "4", "fileName": "c.png"})),
        ];
        let ids: Vec<String> = dedupe_records(records).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["1", "2", "4"]);
    }

    mod reader {
        use super::*;
        use bytes::Bytes;
        use mediashare_db::MemoryBackend;
        use mediashare_storage::LocalBlobStore;
        use tempfile::tempdir;

        struct Fixture {
            reader: GalleryReader,
            backend: MemoryBackend,
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
            let backend = MemoryBackend::new();
            let repository = Arc::new(MediaRepository::new(Arc::new(backend.clone())));
            let reader = GalleryReader::new(repository, blobs.clone());
            Fixture {
                reader,
                backend,
                blobs,
                _dir: dir,
            }
        }

        async fn put_blob(blobs: &Arc<dyn BlobStore>, container: &str, name: &str) {
            blobs
                .upload(container, name, "application/octet-stream", Bytes::from_static(b"x"), None)
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_index_records_preferred_over_blobs() {
            let f = fixture().await;
            f.backend.seed(
                MediaType::Image,
                "image",
                record(serde_json::json!({
                    "id": "from-index",
                    "mediaType": "image",
                    "fileName": "cat.jpg",
                    "blobUrl": "https://x/cat.jpg",
                })),
            );
            put_blob(&f.blobs, "myimages", "1700-other.jpg").await;

            let listed = f.reader.list(&TypeFilter::All).await.unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].id, "from-index");
        }

        #[tokio::test]
        async fn test_empty_index_falls_back_to_blob_enumeration() {
            let f = fixture().await;
            put_blob(&f.blobs, "myimages", "1700-cat.jpg").await;
            put_blob(&f.blobs, "myaudio", "1700-song.mp3").await;

            let listed = f.reader.list(&TypeFilter::All).await.unwrap();
            assert_eq!(listed.len(), 2);
            for record in &listed {
                assert!(!record.id.is_empty());
                assert!(record.blob_url.is_some());
                assert!(record.normalized_type().is_some());
            }
        }

        #[tokio::test]
        async fn test_fallback_honors_type_filter() {
            let f = fixture().await;
            put_blob(&f.blobs, "myimages", "1700-cat.jpg").await;
            put_blob(&f.blobs, "myvideos", "1700-clip.mp4").await;

            let listed = f
                .reader
                .list(&TypeFilter::Only(MediaType::Video))
                .await
                .unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].id, "video-1700-clip.mp4");
        }

        #[tokio::test]
        async fn test_unknown_filter_is_empty_even_with_blobs() {
            let f = fixture().await;
            put_blob(&f.blobs, "myimages", "1700-cat.jpg").await;

            let listed = f.reader.list(&TypeFilter::parse("bogus")).await.unwrap();
            assert!(listed.is_empty());
        }

        #[tokio::test]
        async fn test_index_duplicates_are_deduplicated() {
            let f = fixture().await;
            f.backend.seed(
                MediaType::Image,
                "image",
                record(serde_json::json!({
                    "id": "1", "mediaType": "image", "fileName": "a.png", "blobUrl": "",
                })),
            );
            f.backend.seed(
                MediaType::Image,
                "image",
                record(serde_json::json!({
                    "id": "2", "mediaType": "image", "fileName": "a.png",
                    "blobUrl": "https://x/a.png",
                })),
            );

            let listed = f.reader.list(&TypeFilter::All).await.unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].blob_url.as_deref(), Some("https://x/a.png"));
        }
    }

    #[test]
    fn test_synthesized_records_carry_id_url_and_type() {
        let entries = vec![
            BlobEntry {
                name: "1700-cat.jpg".to_string(),
                url: "https://x/myimages/1700-cat.jpg".to_string(),
            },
            BlobEntry {
                name: "noextension".to_string(),
                url: "https://x/myimages/noextension".to_string(),
            },
        ];
        let now = Utc::now();
        let records = synthesize_from_blobs(MediaType::Image, &entries, now);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "image-1700-cat.jpg");
        assert_eq!(
            records[0].blob_url.as_deref(),
            Some("https://x/myimages/1700-cat.jpg")
        );
        assert_eq!(records[0].normalized_type(), Some(MediaType::Image));
        assert_eq!(records[0].content_type.as_deref(), Some("image/jpg"));
        assert_eq!(records[0].upload_date, Some(now));

        // No extension -> no guessed content type.
        assert_eq!(records[1].content_type, None);
    }
}
