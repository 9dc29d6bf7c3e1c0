//! Storage abstraction trait
//!
//! This module defines the BlobStore trait that all storage backends must
//! implement, along with the error taxonomy shared between them.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use mediashare_core::AppError;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Files above this size are staged in chunks instead of one atomic write.
pub const CHUNKED_UPLOAD_THRESHOLD: u64 = 20 * 1024 * 1024;

/// Size of each staged chunk.
pub const UPLOAD_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Storage operation errors
///
/// Permission (403) and not-found (404) conditions get their own variants so
/// callers can surface distinct user-facing messages. Backends never retry.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid blob name: {0}")]
    InvalidName(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations
pub type BlobResult<T> = Result<T, BlobError>;

impl From<BlobError> for AppError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(name) => AppError::NotFound(format!("File {}", name)),
            BlobError::PermissionDenied(msg) => AppError::PermissionDenied(msg),
            BlobError::Config(msg) => AppError::NotConfigured(msg),
            BlobError::InvalidName(msg) => AppError::InvalidInput(msg),
            other => AppError::Blob(other.to_string()),
        }
    }
}

/// Progress callback, invoked with a 0..=100 percentage after each staged
/// chunk (or once with 100 for single-shot writes).
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// One blob as seen by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub name: String,
    pub url: String,
}

/// Lazy blob listing.
pub type BlobStream = Pin<Box<dyn Stream<Item = BlobResult<BlobEntry>> + Send>>;

/// Storage abstraction trait
///
/// All blob backends (S3-compatible, local filesystem) implement this trait
/// so the gallery services can work against either without coupling to
/// implementation details.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Idempotent create-if-absent for the three fixed containers.
    ///
    /// Callers run this once per process lifetime before the first
    /// operation; running it again is harmless.
    async fn ensure_containers(&self) -> BlobResult<()>;

    /// Write a blob and return its publicly resolvable URL.
    ///
    /// The content type is recorded with the object. Payloads above
    /// [`CHUNKED_UPLOAD_THRESHOLD`] are staged as [`UPLOAD_CHUNK_SIZE`]
    /// chunks and committed as a unit, reporting progress after each chunk;
    /// smaller payloads use a single atomic write.
    async fn upload(
        &self,
        container: &str,
        blob_name: &str,
        content_type: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> BlobResult<String>;

    /// Remove a blob. Returns `Ok(false)` when it was already absent; absence
    /// is never an error here.
    async fn delete(&self, container: &str, blob_name: &str) -> BlobResult<bool>;

    /// Enumerate all blobs in a container, lazily.
    async fn list(&self, container: &str) -> BlobResult<BlobStream>;

    /// Deterministic public URL for a blob.
    fn blob_url(&self, container: &str, blob_name: &str) -> String;

    /// Temporary signed URL for direct access. Backends without signing
    /// return the plain URL.
    async fn signed_url(
        &self,
        container: &str,
        blob_name: &str,
        expires_in: Duration,
    ) -> BlobResult<String>;
}
