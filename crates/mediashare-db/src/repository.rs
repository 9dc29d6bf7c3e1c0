//! Media repository
//!
//! The gallery-facing metadata client. Normalizes media types on every path,
//! keeps creates idempotent, and owns the deletion ladder that copes with
//! records whose true partition key is unknowable ahead of time.

use crate::backend::{DocumentBackend, MetadataError, MetadataResult};
use mediashare_core::{MediaRecord, MediaType, RecordPatch, TypeFilter};
use serde_json::Value as JsonValue;
use std::sync::Arc;

#[derive(Clone)]
pub struct MediaRepository {
    backend: Arc<dyn DocumentBackend>,
}

impl MediaRepository {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    /// Idempotent create.
    ///
    /// If a record with the same id or blob name already exists in the target
    /// collection, that record is returned unchanged and nothing is written.
    /// Records with no recognizable media type are rejected outright rather
    /// than guessed into a default collection.
    pub async fn create(&self, mut record: MediaRecord) -> MetadataResult<MediaRecord> {
        let media_type = record.derived_type().ok_or_else(|| {
            MetadataError::InvalidRecord(format!(
                "unrecognized media type (mediaType: {:?}, contentType: {:?})",
                record.media_type, record.content_type
            ))
        })?;

        // Duplicate check is best-effort: a failed probe logs and falls
        // through to the insert rather than blocking the write.
        match self
            .backend
            .find_by_id_or_blob_name(media_type, &record.id, record.blob_name.as_deref())
            .await
        {
            Ok(Some(existing)) => {
                tracing::info!(
                    collection = media_type.collection_name(),
                    id = %existing.id,
                    "record already exists, skipping creation"
                );
                return Ok(existing);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "duplicate check failed, continuing with insert");
            }
        }

        record.media_type = Some(media_type.as_str().to_string());
        let partition_key = record
            .partition_key
            .clone()
            .unwrap_or_else(|| media_type.as_str().to_string());
        record.partition_key = Some(partition_key.clone());

        self.backend
            .insert(media_type, &partition_key, &record)
            .await?;

        tracing::info!(
            collection = media_type.collection_name(),
            id = %record.id,
            "created record"
        );
        Ok(record)
    }

    /// All records from every collection, newest first. A collection that
    /// fails to answer is skipped with a warning so one bad collection
    /// degrades the listing instead of failing it.
    pub async fn get_all(&self) -> MetadataResult<Vec<MediaRecord>> {
        let mut all = Vec::new();
        for media_type in MediaType::ALL {
            match self.backend.query_collection(media_type).await {
                Ok(mut records) => all.append(&mut records),
                Err(e) => {
                    tracing::warn!(
                        collection = media_type.collection_name(),
                        error = %e,
                        "collection query failed, skipping"
                    );
                }
            }
        }
        all.sort_by(|a, b| b.sort_date().cmp(&a.sort_date()));
        Ok(all)
    }

    /// Records of one type, newest first. `All` is equivalent to
    /// [`get_all`](Self::get_all); unknown types yield an empty list, not an
    /// error.
    pub async fn get_by_type(&self, filter: &TypeFilter) -> MetadataResult<Vec<MediaRecord>> {
        match filter {
            TypeFilter::All => self.get_all().await,
            TypeFilter::Unknown(value) => {
                tracing::warn!(media_type = %value, "unknown media type requested");
                Ok(Vec::new())
            }
            TypeFilter::Only(media_type) => {
                let mut records = match self.backend.query_collection(*media_type).await {
                    Ok(records) => records,
                    Err(e) => {
                        tracing::warn!(
                            collection = media_type.collection_name(),
                            error = %e,
                            "collection query failed"
                        );
                        return Ok(Vec::new());
                    }
                };
                records.sort_by(|a, b| b.sort_date().cmp(&a.sort_date()));
                Ok(records)
            }
        }
    }

    /// Find a record by id: filtered queries across every collection first,
    /// then direct point reads with the id as its own partition key.
    pub async fn get_by_id(&self, id: &str) -> MetadataResult<Option<MediaRecord>> {
        for media_type in MediaType::ALL {
            if let Some(record) = self.backend.find_by_id(media_type, id).await? {
                return Ok(Some(record));
            }
        }
        for media_type in MediaType::ALL {
            if let Some(record) = self.backend.read_point(media_type, id, id).await? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Merge a patch into an existing record and replace it in place. A new
    /// content type re-derives the stored media type.
    pub async fn update(&self, id: &str, patch: RecordPatch) -> MetadataResult<MediaRecord> {
        for media_type in MediaType::ALL {
            let Some(mut record) = self.backend.find_by_id(media_type, id).await? else {
                continue;
            };

            if let Some(content_type) = &patch.content_type {
                let derived = MediaType::from_content_type(content_type).ok_or_else(|| {
                    MetadataError::InvalidRecord(format!(
                        "unrecognized content type: {content_type}"
                    ))
                })?;
                record.media_type = Some(derived.as_str().to_string());
                record.content_type = Some(content_type.clone());
            }
            if let Some(title) = patch.title {
                record.title = Some(title);
            }
            if let Some(description) = patch.description {
                record.description = Some(description);
            }
            if let Some(tags) = patch.tags {
                record.tags = tags;
            }
            if let Some(blob_url) = patch.blob_url {
                record.blob_url = Some(blob_url);
            }

            let partition_key = record
                .partition_key
                .clone()
                .unwrap_or_else(|| id.to_string());
            self.backend
                .replace(media_type, id, &partition_key, &record)
                .await?;
            return Ok(record);
        }

        Err(MetadataError::NotFound(id.to_string()))
    }

    /// Delete a record wherever it lives.
    ///
    /// Every collection is searched in fixed order regardless of the hint;
    /// legacy records are sometimes filed under the wrong one. Returns
    /// `Ok(false)` when the id exists nowhere (already gone is not an error).
    pub async fn delete(
        &self,
        id: &str,
        media_type_hint: Option<MediaType>,
    ) -> MetadataResult<bool> {
        tracing::debug!(id, hint = ?media_type_hint, "deleting record");

        for collection in MediaType::ALL {
            let found = match self.backend.find_by_id(collection, id).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(
                        collection = collection.collection_name(),
                        error = %e,
                        "collection search failed, trying the next one"
                    );
                    continue;
                }
            };
            let Some(record) = found else { continue };

            tracing::debug!(
                collection = collection.collection_name(),
                id,
                "found record to delete"
            );
            return self.delete_found(collection, id, &record).await.map(|_| true);
        }

        tracing::debug!(id, "record not found in any collection, treating as deleted");
        Ok(false)
    }

    /// The deletion ladder for a record known to exist in `collection`.
    ///
    /// Deterministic path first (records written by this implementation carry
    /// their partition key), then the id as its own partition key, then one
    /// attempt per candidate field value, then a re-check in case a
    /// concurrent actor removed the record under us.
    async fn delete_found(
        &self,
        collection: MediaType,
        id: &str,
        record: &MediaRecord,
    ) -> MetadataResult<()> {
        if let Some(partition_key) = &record.partition_key {
            match self.backend.delete_point(collection, id, partition_key).await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    tracing::debug!(id, partition_key, "stored partition key missed");
                }
                Err(e) => {
                    tracing::debug!(id, partition_key, error = %e, "stored partition key failed");
                }
            }
        }

        match self.backend.delete_point(collection, id, id).await {
            Ok(true) => return Ok(()),
            Ok(false) => tracing::debug!(id, "id-as-partition-key delete missed"),
            Err(e) => tracing::debug!(id, error = %e, "id-as-partition-key delete failed"),
        }

        for candidate in partition_key_candidates(record) {
            match self.backend.delete_point(collection, id, &candidate).await {
                Ok(true) => {
                    tracing::info!(
                        id,
                        partition_key = %candidate,
                        "deleted record using candidate partition key"
                    );
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(id, partition_key = %candidate, error = %e, "candidate failed");
                }
            }
        }

        // The record may have vanished under a concurrent delete or an
        // earlier partial attempt; already gone counts as success.
        match self.backend.find_by_id(collection, id).await {
            Ok(None) => {
                tracing::debug!(id, "record vanished during deletion, treating as deleted");
                Ok(())
            }
            Ok(Some(_)) => Err(MetadataError::DeleteExhausted {
                id: id.to_string(),
                collection: collection.collection_name().to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Every scalar field value on the record, as candidate partition keys for
/// the retry ladder. Order follows the serialized document; duplicates are
/// dropped so each key is attempted once.
fn partition_key_candidates(record: &MediaRecord) -> Vec<String> {
    let JsonValue::Object(fields) = serde_json::to_value(record).unwrap_or(JsonValue::Null) else {
        return Vec::new();
    };

    let mut seen = std::collections::HashSet::new();
    let mut candidates = Vec::new();
    for value in fields.values() {
        let candidate = match value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            _ => continue,
        };
        if seen.insert(candidate.clone()) {
            candidates.push(candidate);
        }
    }
    candidates
}
