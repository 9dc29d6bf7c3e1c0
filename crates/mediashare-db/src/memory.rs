//! In-memory document backend
//!
//! Honors the same (collection, id, partition key) routing as the Postgres
//! backend, which is what the deletion-ladder tests depend on: a point
//! delete with the wrong partition key misses. Used by tests throughout the
//! workspace.

use crate::backend::{DocumentBackend, MetadataError, MetadataResult};
use async_trait::async_trait;
use mediashare_core::{MediaRecord, MediaType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct StoredDoc {
    partition_key: String,
    record: MediaRecord,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    collections: Arc<Mutex<HashMap<MediaType, Vec<StoredDoc>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert directly under an arbitrary partition key, bypassing the
    /// repository. Simulates legacy data written by other clients.
    pub fn seed(&self, collection: MediaType, partition_key: &str, record: MediaRecord) {
        self.collections
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(StoredDoc {
                partition_key: partition_key.to_string(),
                record,
            });
    }

    /// Number of documents in a collection (for test assertions).
    pub fn count(&self, collection: MediaType) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(&collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Whether any collection holds a document with this id.
    pub fn contains(&self, id: &str) -> bool {
        let collections = self.collections.lock().unwrap();
        collections
            .values()
            .any(|docs| docs.iter().any(|d| d.record.id == id))
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn insert(
        &self,
        collection: MediaType,
        partition_key: &str,
        record: &MediaRecord,
    ) -> MetadataResult<()> {
        self.seed(collection, partition_key, record.clone());
        Ok(())
    }

    async fn query_collection(&self, collection: MediaType) -> MetadataResult<Vec<MediaRecord>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().map(|d| d.record.clone()).collect())
            .unwrap_or_default())
    }

    async fn find_by_id(
        &self,
        collection: MediaType,
        id: &str,
    ) -> MetadataResult<Option<MediaRecord>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(&collection).and_then(|docs| {
            docs.iter()
                .find(|d| d.record.id == id)
                .map(|d| d.record.clone())
        }))
    }

    async fn find_by_id_or_blob_name(
        &self,
        collection: MediaType,
        id: &str,
        blob_name: Option<&str>,
    ) -> MetadataResult<Option<MediaRecord>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(&collection).and_then(|docs| {
            docs.iter()
                .find(|d| {
                    d.record.id == id
                        || (blob_name.is_some() && d.record.blob_name.as_deref() == blob_name)
                })
                .map(|d| d.record.clone())
        }))
    }

    async fn read_point(
        &self,
        collection: MediaType,
        id: &str,
        partition_key: &str,
    ) -> MetadataResult<Option<MediaRecord>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections.get(&collection).and_then(|docs| {
            docs.iter()
                .find(|d| d.record.id == id && d.partition_key == partition_key)
                .map(|d| d.record.clone())
        }))
    }

    async fn replace(
        &self,
        collection: MediaType,
        id: &str,
        partition_key: &str,
        record: &MediaRecord,
    ) -> MetadataResult<()> {
        let mut collections = self.collections.lock().unwrap();
        let docs = collections
            .get_mut(&collection)
            .ok_or_else(|| MetadataError::NotFound(id.to_string()))?;
        let doc = docs
            .iter_mut()
            .find(|d| d.record.id == id && d.partition_key == partition_key)
            .ok_or_else(|| MetadataError::NotFound(id.to_string()))?;
        doc.record = record.clone();
        Ok(())
    }

    async fn delete_point(
        &self,
        collection: MediaType,
        id: &str,
        partition_key: &str,
    ) -> MetadataResult<bool> {
        let mut collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| !(d.record.id == id && d.partition_key == partition_key));
        Ok(docs.len() < before)
    }
}
