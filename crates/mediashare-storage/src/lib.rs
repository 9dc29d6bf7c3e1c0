//! MediaShare blob storage
//!
//! Storage abstraction and backends for the media gallery's blob side.
//!
//! # Container layout
//!
//! Three fixed containers, one per media type: `myimages`, `myaudio`,
//! `myvideos`. On S3-compatible backends a container is a key prefix inside
//! one bucket; on the local backend it is a directory. Blob names follow
//! `<unix-epoch-ms>-<originalFileName>` and must not contain `..` or a
//! leading `/`.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_blob_store;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use traits::{
    BlobEntry, BlobError, BlobResult, BlobStore, BlobStream, ProgressFn,
    CHUNKED_UPLOAD_THRESHOLD, UPLOAD_CHUNK_SIZE,
};
