//! MediaShare metadata store
//!
//! The document index mirroring blob storage: one logical collection per
//! media type, each record partitioned by a content-type-derived key.
//!
//! Two layers:
//!
//! - [`DocumentBackend`]: collection-scoped document primitives (point
//!   reads, inserts, replaces, and deletes keyed by collection + id +
//!   partition key). Implemented for Postgres (JSONB) and in-memory.
//! - [`MediaRepository`]: the gallery-facing contract: idempotent create,
//!   type-normalized reads sorted newest-first, and the partition-key
//!   deletion ladder that copes with legacy records.

pub mod backend;
pub mod memory;
pub mod postgres;
pub mod repository;

// Re-export commonly used types
pub use backend::{DocumentBackend, MetadataError, MetadataResult};
pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;
pub use repository::MediaRepository;
