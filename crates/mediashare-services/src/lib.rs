//! MediaShare gallery services
//!
//! The coordination layer between the metadata index and blob storage:
//!
//! - [`reconcile`]: listings that prefer the index and fall back to direct
//!   blob enumeration, deduplicated by file name.
//! - [`delete`]: dual-store deletion with a tri-state outcome.
//! - [`upload`]: validate, store, and index a new file.

pub mod delete;
pub mod reconcile;
pub mod upload;

pub use delete::{DeleteOutcome, DeleteReport, DeletionCoordinator};
pub use reconcile::{dedupe_records, synthesize_from_blobs, GalleryReader};
pub use upload::{UploadRequest, UploadService};
