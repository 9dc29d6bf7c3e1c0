//! MediaShare core library
//!
//! Domain models, validation policy, configuration, error types, and the
//! notification bus shared by the storage, database, and service crates.

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, StorageBackendKind};
pub use error::AppError;
pub use events::{Notification, NotificationBus, NotificationLevel};
pub use models::{MediaRecord, MediaType, RecordPatch, TypeFilter};
pub use validation::{UploadPolicy, ValidationError};
