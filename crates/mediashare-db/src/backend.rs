//! Document backend trait
//!
//! Collection-scoped primitives the repository builds on. Point operations
//! are keyed by (collection, id, partition key) the way a partitioned
//! document database routes them: a wrong partition key means "no such
//! document", not an error.

use async_trait::async_trait;
use mediashare_core::{AppError, MediaRecord, MediaType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Could not delete record {id} from {collection} using any method")]
    DeleteExhausted { id: String, collection: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

impl From<MetadataError> for AppError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(id) => AppError::NotFound(format!("Record {}", id)),
            MetadataError::InvalidRecord(msg) => AppError::InvalidInput(msg),
            MetadataError::Config(msg) => AppError::NotConfigured(msg),
            other => AppError::Metadata(other.to_string()),
        }
    }
}

/// Document-database primitives, one logical collection per media type.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Raw write of a record under the given partition key.
    async fn insert(
        &self,
        collection: MediaType,
        partition_key: &str,
        record: &MediaRecord,
    ) -> MetadataResult<()>;

    /// Full scan of one collection.
    async fn query_collection(&self, collection: MediaType) -> MetadataResult<Vec<MediaRecord>>;

    /// Filtered query by id; no partition key needed.
    async fn find_by_id(
        &self,
        collection: MediaType,
        id: &str,
    ) -> MetadataResult<Option<MediaRecord>>;

    /// Filtered query matching either the id or the blob name; used by the
    /// idempotent-create duplicate check.
    async fn find_by_id_or_blob_name(
        &self,
        collection: MediaType,
        id: &str,
        blob_name: Option<&str>,
    ) -> MetadataResult<Option<MediaRecord>>;

    /// Direct point read; requires the exact partition key.
    async fn read_point(
        &self,
        collection: MediaType,
        id: &str,
        partition_key: &str,
    ) -> MetadataResult<Option<MediaRecord>>;

    /// Replace a document in place; `NotFound` when no document matches the
    /// (id, partition key) pair.
    async fn replace(
        &self,
        collection: MediaType,
        id: &str,
        partition_key: &str,
        record: &MediaRecord,
    ) -> MetadataResult<()>;

    /// Point delete. Returns `Ok(false)` when no document matches the
    /// (id, partition key) pair, including a correct id under a wrong
    /// partition key.
    async fn delete_point(
        &self,
        collection: MediaType,
        id: &str,
        partition_key: &str,
    ) -> MetadataResult<bool>;
}
