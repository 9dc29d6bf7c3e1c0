//! Error types module
//!
//! All errors surfaced by the gallery are unified under [`AppError`]. Internal
//! diagnostic detail stays in the `Display` output (and in tracing fields at
//! the call sites); [`AppError::client_message`] is the translated text shown
//! to end users.

use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Required credentials or endpoints are missing; every operation
    /// short-circuits on this.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Blob(String),

    #[error("Metadata store error: {0}")]
    Metadata(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl AppError {
    /// Client-facing message; provider error codes and stack detail stay out.
    pub fn client_message(&self) -> String {
        match self {
            AppError::NotConfigured(_) => {
                "Storage is not configured. Please check your environment variables.".to_string()
            }
            AppError::Validation(err) => err.to_string(),
            AppError::Blob(_) => "Failed to access storage. Please try again later.".to_string(),
            AppError::Metadata(_) => {
                "Failed to access the media index. Please try again later.".to_string()
            }
            AppError::PermissionDenied(_) => {
                "Permission denied. Please check your storage permissions.".to_string()
            }
            AppError::NotFound(msg) => {
                format!("{} not found. It may have been deleted already.", msg)
            }
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Internal(_) => "Internal error. Please try again later.".to_string(),
        }
    }
}
