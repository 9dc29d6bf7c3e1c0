//! Dual-store deletion
//!
//! The two stores share no transaction, so deletion always attempts both
//! sides independently and reports precisely which succeeded instead of
//! aborting early. The caller re-fetches the listing afterwards regardless
//! of outcome.

use mediashare_core::{AppError, MediaRecord, MediaType, NotificationBus, TypeFilter};
use mediashare_db::MediaRepository;
use mediashare_storage::BlobStore;
use std::sync::Arc;

/// Which of the two stores the record was actually removed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Removed from both the metadata index and blob storage.
    Both,
    /// Index record removed; the storage file remains.
    MetadataOnly,
    /// Storage file removed; the index record remains.
    BlobOnly,
    /// Removed from neither store.
    Neither,
}

/// The two independent deletion results, composed into a tri-state outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteReport {
    pub metadata_deleted: bool,
    pub blob_deleted: bool,
}

impl DeleteReport {
    pub fn outcome(&self) -> DeleteOutcome {
        match (self.metadata_deleted, self.blob_deleted) {
            (true, true) => DeleteOutcome::Both,
            (true, false) => DeleteOutcome::MetadataOnly,
            (false, true) => DeleteOutcome::BlobOnly,
            (false, false) => DeleteOutcome::Neither,
        }
    }

    /// Anything removed counts as (at least partial) success.
    pub fn is_success(&self) -> bool {
        self.metadata_deleted || self.blob_deleted
    }

    pub fn message(&self) -> &'static str {
        match self.outcome() {
            DeleteOutcome::Both => {
                "File deleted successfully from both the media index and storage."
            }
            DeleteOutcome::MetadataOnly => {
                "File record deleted from the media index, but the storage file could not be removed."
            }
            DeleteOutcome::BlobOnly => {
                "File deleted from storage, but the media index record could not be removed."
            }
            DeleteOutcome::Neither => "Failed to delete file. Please try again.",
        }
    }
}

pub struct DeletionCoordinator {
    repository: Arc<MediaRepository>,
    blobs: Arc<dyn BlobStore>,
    bus: NotificationBus,
}

impl DeletionCoordinator {
    pub fn new(
        repository: Arc<MediaRepository>,
        blobs: Arc<dyn BlobStore>,
        bus: NotificationBus,
    ) -> Self {
        Self {
            repository,
            blobs,
            bus,
        }
    }

    /// Delete a blob and its index record, given the blob identifier the
    /// user acted on.
    ///
    /// The index search matches the identifier against `blobName`,
    /// `fileName`, or `name` across every collection; the blob delete runs
    /// regardless of what the index side achieved.
    pub async fn delete(
        &self,
        blob_name: &str,
        container_name: &str,
        media_type_hint: Option<MediaType>,
    ) -> Result<DeleteReport, AppError> {
        if blob_name.is_empty() {
            return Err(AppError::InvalidInput(
                "A blob name is required for deletion.".to_string(),
            ));
        }

        tracing::info!(blob_name, container_name, hint = ?media_type_hint, "deleting file");

        let metadata_deleted = self.delete_metadata(blob_name, media_type_hint).await;
        let blob_deleted = self.delete_blob(blob_name, container_name).await;

        let report = DeleteReport {
            metadata_deleted,
            blob_deleted,
        };

        match report.outcome() {
            DeleteOutcome::Both => self.bus.success(report.message()),
            DeleteOutcome::MetadataOnly | DeleteOutcome::BlobOnly => {
                self.bus.warning(report.message())
            }
            DeleteOutcome::Neither => self.bus.error(report.message()),
        }

        Ok(report)
    }

    /// Find the matching index record across every collection, in fixed
    /// enumeration order; first match wins.
    async fn find_record(&self, blob_name: &str) -> Option<MediaRecord> {
        for media_type in MediaType::ALL {
            let records = match self
                .repository
                .get_by_type(&TypeFilter::Only(media_type))
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        collection = media_type.collection_name(),
                        error = %e,
                        "search failed, trying the next collection"
                    );
                    continue;
                }
            };
            if let Some(record) = records.into_iter().find(|r| r.matches_name(blob_name)) {
                tracing::debug!(
                    id = %record.id,
                    collection = media_type.collection_name(),
                    "found matching index record"
                );
                return Some(record);
            }
        }
        None
    }

    async fn delete_metadata(&self, blob_name: &str, hint: Option<MediaType>) -> bool {
        let Some(record) = self.find_record(blob_name).await else {
            tracing::warn!(blob_name, "no matching record in the media index");
            return false;
        };

        match self.repository.delete(&record.id, hint).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!(error = %e, id = %record.id, "failed to delete index record");
                false
            }
        }
    }

    async fn delete_blob(&self, blob_name: &str, container_name: &str) -> bool {
        match self.blobs.delete(container_name, blob_name).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!(blob_name, container_name, "blob already absent");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, blob_name, container_name, "failed to delete blob");
                let err = AppError::from(e);
                self.bus.error(format!(
                    "Storage file could not be deleted: {}",
                    err.client_message()
                ));
                false
            }
        }
    }
}
