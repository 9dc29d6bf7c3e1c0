//! Upload validation policy
//!
//! All checks run before any network call; a rejected file costs nothing
//! remotely. Limits and allowlists follow the fixed container configuration.

use crate::models::MediaType;

/// Default size limit for images and audio.
pub const DEFAULT_MAX_MEDIA_SIZE_BYTES: u64 = 20 * 1024 * 1024;
/// Default size limit for video.
pub const DEFAULT_MAX_VIDEO_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// MIME types accepted into the container for the given media type.
pub fn allowed_content_types(media_type: MediaType) -> &'static [&'static str] {
    match media_type {
        MediaType::Image => &["image/jpeg", "image/png", "image/gif", "image/webp"],
        MediaType::Audio => &["audio/mpeg", "audio/wav", "audio/ogg", "audio/m4a"],
        MediaType::Video => &["video/mp4", "video/webm", "video/ogg", "video/quicktime"],
    }
}

/// Canonical MIME type for a file extension, for callers that only have a
/// path. Covers exactly the allowlisted formats.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "oga" => Some("audio/ogg"),
        "m4a" => Some("audio/m4a"),
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "ogg" | "ogv" => Some("video/ogg"),
        "mov" => Some("video/quicktime"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unsupported file type: {content_type}. Please upload an image, video, or audio file.")]
    UnknownContentType { content_type: String },

    #[error("This {media_type} format ({content_type}) is not supported. Supported formats: {}", .allowed.join(", "))]
    UnsupportedFormat {
        media_type: MediaType,
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("This {media_type} file is {size} bytes, over the {limit} byte limit for {media_type} uploads.")]
    FileTooLarge {
        media_type: MediaType,
        size: u64,
        limit: u64,
    },

    #[error("Empty file")]
    EmptyFile,
}

/// Size limits applied per media type; the MIME allowlists are fixed.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    max_media_size_bytes: u64,
    max_video_size_bytes: u64,
}

impl UploadPolicy {
    pub fn new(max_media_size_bytes: u64, max_video_size_bytes: u64) -> Self {
        Self {
            max_media_size_bytes,
            max_video_size_bytes,
        }
    }

    /// Size limit for the given media type. The boundary is inclusive: a
    /// file of exactly the limit is accepted.
    pub fn size_limit(&self, media_type: MediaType) -> u64 {
        match media_type {
            MediaType::Video => self.max_video_size_bytes,
            MediaType::Image | MediaType::Audio => self.max_media_size_bytes,
        }
    }

    /// Validate a file before upload, returning its resolved media type.
    pub fn validate(&self, content_type: &str, size: u64) -> Result<MediaType, ValidationError> {
        let media_type = MediaType::from_content_type(content_type).ok_or_else(|| {
            ValidationError::UnknownContentType {
                content_type: content_type.to_string(),
            }
        })?;

        let allowed = allowed_content_types(media_type);
        if !allowed.contains(&content_type) {
            return Err(ValidationError::UnsupportedFormat {
                media_type,
                content_type: content_type.to_string(),
                allowed: allowed.iter().map(|ct| ct.to_string()).collect(),
            });
        }

        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        let limit = self.size_limit(media_type);
        if size > limit {
            return Err(ValidationError::FileTooLarge {
                media_type,
                size,
                limit,
            });
        }

        Ok(media_type)
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MEDIA_SIZE_BYTES, DEFAULT_MAX_VIDEO_SIZE_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_boundary_is_inclusive() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.validate("video/mp4", DEFAULT_MAX_VIDEO_SIZE_BYTES),
            Ok(MediaType::Video)
        );

        let err = policy
            .validate("video/mp4", DEFAULT_MAX_VIDEO_SIZE_BYTES + 1)
            .unwrap_err();
        match &err {
            ValidationError::FileTooLarge { size, limit, .. } => {
                assert_eq!(*size, DEFAULT_MAX_VIDEO_SIZE_BYTES + 1);
                assert_eq!(*limit, DEFAULT_MAX_VIDEO_SIZE_BYTES);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The message names the actual size, the limit, and the media type.
        let message = err.to_string();
        assert!(message.contains(&(DEFAULT_MAX_VIDEO_SIZE_BYTES + 1).to_string()));
        assert!(message.contains(&DEFAULT_MAX_VIDEO_SIZE_BYTES.to_string()));
        assert!(message.contains("video"));
    }

    #[test]
    fn test_image_limit_is_smaller() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.validate("image/png", DEFAULT_MAX_MEDIA_SIZE_BYTES),
            Ok(MediaType::Image)
        );
        assert!(matches!(
            policy.validate("image/png", DEFAULT_MAX_MEDIA_SIZE_BYTES + 1),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_unknown_content_type_rejected() {
        let policy = UploadPolicy::default();
        assert!(matches!(
            policy.validate("application/pdf", 10),
            Err(ValidationError::UnknownContentType { .. })
        ));
    }

    #[test]
    fn test_disallowed_format_names_supported_ones() {
        let policy = UploadPolicy::default();
        let err = policy.validate("image/tiff", 10).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("image/tiff"));
        assert!(message.contains("image/jpeg"));
    }

    #[test]
    fn test_empty_file_rejected() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.validate("image/png", 0),
            Err(ValidationError::EmptyFile)
        );
    }

    #[test]
    fn test_content_type_for_extension_round_trips_allowlists() {
        for media_type in MediaType::ALL {
            for ct in allowed_content_types(media_type) {
                // Every allowlisted MIME type is reachable from some extension.
                assert!(
                    [
                        "jpg", "png", "gif", "webp", "mp3", "wav", "oga", "m4a", "mp4", "webm",
                        "ogg", "mov"
                    ]
                    .iter()
                    .any(|ext| content_type_for_extension(ext) == Some(*ct)),
                    "no extension maps to {ct}"
                );
            }
        }
        assert_eq!(content_type_for_extension("exe"), None);
    }
}
