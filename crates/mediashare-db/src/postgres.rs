//! Postgres document backend
//!
//! Stores every collection in one `media_documents` table: the collection
//! name, the record id, the partition key, and the full record as JSONB.
//! The composite primary key gives point operations the same routing
//! semantics a partitioned document database has.

use crate::backend::{DocumentBackend, MetadataError, MetadataResult};
use async_trait::async_trait;
use mediashare_core::{MediaRecord, MediaType};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS media_documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    partition_key TEXT NOT NULL,
    doc JSONB NOT NULL,
    PRIMARY KEY (collection, id, partition_key)
)
"#;

#[derive(Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> MetadataResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| MetadataError::Config(format!("Failed to connect: {}", e)))?;
        Ok(Self::new(pool))
    }

    /// Idempotent schema bootstrap; safe to run on every startup.
    pub async fn ensure_schema(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| MetadataError::Config(format!("Failed to create schema: {}", e)))?;
        Ok(())
    }

    fn encode(record: &MediaRecord) -> MetadataResult<JsonValue> {
        serde_json::to_value(record)
            .map_err(|e| MetadataError::InvalidRecord(format!("unserializable record: {}", e)))
    }

    /// Decode a stored document, tolerating malformed legacy rows by
    /// skipping them with a warning instead of failing the whole read.
    fn decode(collection: MediaType, doc: JsonValue) -> Option<MediaRecord> {
        match serde_json::from_value::<MediaRecord>(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    collection = collection.collection_name(),
                    error = %e,
                    "skipping malformed document"
                );
                None
            }
        }
    }
}

#[async_trait]
impl DocumentBackend for PostgresBackend {
    async fn insert(
        &self,
        collection: MediaType,
        partition_key: &str,
        record: &MediaRecord,
    ) -> MetadataResult<()> {
        let doc = Self::encode(record)?;
        sqlx::query(
            "INSERT INTO media_documents (collection, id, partition_key, doc) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(collection.collection_name())
        .bind(&record.id)
        .bind(partition_key)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                collection = collection.collection_name(),
                id = %record.id,
                error = %e,
                "insert failed"
            );
            MetadataError::WriteFailed(e.to_string())
        })?;
        Ok(())
    }

    async fn query_collection(&self, collection: MediaType) -> MetadataResult<Vec<MediaRecord>> {
        let rows: Vec<JsonValue> =
            sqlx::query_scalar("SELECT doc FROM media_documents WHERE collection = $1")
                .bind(collection.collection_name())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| MetadataError::QueryFailed(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|doc| Self::decode(collection, doc))
            .collect())
    }

    async fn find_by_id(
        &self,
        collection: MediaType,
        id: &str,
    ) -> MetadataResult<Option<MediaRecord>> {
        let row: Option<JsonValue> = sqlx::query_scalar(
            "SELECT doc FROM media_documents WHERE collection = $1 AND id = $2 LIMIT 1",
        )
        .bind(collection.collection_name())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MetadataError::QueryFailed(e.to_string()))?;

        Ok(row.and_then(|doc| Self::decode(collection, doc)))
    }

    async fn find_by_id_or_blob_name(
        &self,
        collection: MediaType,
        id: &str,
        blob_name: Option<&str>,
    ) -> MetadataResult<Option<MediaRecord>> {
        let row: Option<JsonValue> = sqlx::query_scalar(
            "SELECT doc FROM media_documents \
             WHERE collection = $1 AND (id = $2 OR doc->>'blobName' = $3) LIMIT 1",
        )
        .bind(collection.collection_name())
        .bind(id)
        .bind(blob_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MetadataError::QueryFailed(e.to_string()))?;

        Ok(row.and_then(|doc| Self::decode(collection, doc)))
    }

    async fn read_point(
        &self,
        collection: MediaType,
        id: &str,
        partition_key: &str,
    ) -> MetadataResult<Option<MediaRecord>> {
        let row: Option<JsonValue> = sqlx::query_scalar(
            "SELECT doc FROM media_documents \
             WHERE collection = $1 AND id = $2 AND partition_key = $3",
        )
        .bind(collection.collection_name())
        .bind(id)
        .bind(partition_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MetadataError::QueryFailed(e.to_string()))?;

        Ok(row.and_then(|doc| Self::decode(collection, doc)))
    }

    async fn replace(
        &self,
        collection: MediaType,
        id: &str,
        partition_key: &str,
        record: &MediaRecord,
    ) -> MetadataResult<()> {
        let doc = Self::encode(record)?;
        let result = sqlx::query(
            "UPDATE media_documents SET doc = $4 \
             WHERE collection = $1 AND id = $2 AND partition_key = $3",
        )
        .bind(collection.collection_name())
        .bind(id)
        .bind(partition_key)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(|e| MetadataError::WriteFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_point(
        &self,
        collection: MediaType,
        id: &str,
        partition_key: &str,
    ) -> MetadataResult<bool> {
        let result = sqlx::query(
            "DELETE FROM media_documents \
             WHERE collection = $1 AND id = $2 AND partition_key = $3",
        )
        .bind(collection.collection_name())
        .bind(id)
        .bind(partition_key)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                collection = collection.collection_name(),
                id = id,
                error = %e,
                "point delete failed"
            );
            MetadataError::WriteFailed(e.to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }
}
