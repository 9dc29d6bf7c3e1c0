use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Media type enum
///
/// Selects both the blob container and the metadata collection a file
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Audio,
    Video,
}

impl MediaType {
    /// Fixed enumeration order used for multi-collection searches.
    pub const ALL: [MediaType; 3] = [MediaType::Image, MediaType::Audio, MediaType::Video];

    /// Normalize loose aliases found in legacy records and container names.
    ///
    /// Idempotent: the canonical names map to themselves.
    pub fn normalize(value: &str) -> Option<MediaType> {
        match value {
            "image" | "images" | "myimage" => Some(MediaType::Image),
            "audio" | "myaudio" => Some(MediaType::Audio),
            "video" | "myvideo" | "myvideos" => Some(MediaType::Video),
            _ => None,
        }
    }

    /// Derive the media type from a MIME type (`image/png` -> `Image`).
    pub fn from_content_type(content_type: &str) -> Option<MediaType> {
        let prefix = content_type.split('/').next().unwrap_or_default();
        Self::normalize(prefix)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Audio => "audio",
            MediaType::Video => "video",
        }
    }

    /// Blob container holding files of this type.
    pub fn container_name(&self) -> &'static str {
        match self {
            MediaType::Image => "myimages",
            MediaType::Audio => "myaudio",
            MediaType::Video => "myvideos",
        }
    }

    /// Metadata collection holding records of this type.
    pub fn collection_name(&self) -> &'static str {
        match self {
            MediaType::Image => "imagesContainer",
            MediaType::Audio => "audioContainer",
            MediaType::Video => "videoContainer",
        }
    }

    /// Resolve a container name back to its media type.
    pub fn for_container(container_name: &str) -> Option<MediaType> {
        Self::ALL
            .into_iter()
            .find(|mt| mt.container_name() == container_name)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing filter parsed from user input.
///
/// Unknown types are carried as-is and yield empty listings rather than
/// errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    All,
    Only(MediaType),
    Unknown(String),
}

impl TypeFilter {
    pub fn parse(value: &str) -> TypeFilter {
        if value == "all" {
            TypeFilter::All
        } else if let Some(media_type) = MediaType::normalize(value) {
            TypeFilter::Only(media_type)
        } else {
            TypeFilter::Unknown(value.to_string())
        }
    }
}

impl std::fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeFilter::All => f.write_str("all"),
            TypeFilter::Only(media_type) => f.write_str(media_type.as_str()),
            TypeFilter::Unknown(value) => f.write_str(value),
        }
    }
}

/// Metadata record describing one uploaded file.
///
/// This is the wire contract with the document store: camelCase field names,
/// every field except `id` optional on read (legacy records are sparse), and
/// unknown fields preserved verbatim through the flattened map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: String,
    /// Raw media type as stored; may be a loose alias on legacy records.
    /// Use [`MediaRecord::normalized_type`] to interpret it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Join key with the blob store; preserved verbatim on both sides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Legacy alias carried by synthesized and imported records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Partition key the record was stored under. Records written by this
    /// implementation carry it so deletion is a single point operation;
    /// records without it go through the retry ladder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
    /// Unknown fields pass through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

impl MediaRecord {
    /// Normalized media type from the `mediaType` field, if recognizable.
    pub fn normalized_type(&self) -> Option<MediaType> {
        self.media_type.as_deref().and_then(MediaType::normalize)
    }

    /// Media type for routing: `mediaType` first, `contentType` prefix as a
    /// fallback. `None` means the record belongs to no known bucket.
    pub fn derived_type(&self) -> Option<MediaType> {
        self.normalized_type().or_else(|| {
            self.content_type
                .as_deref()
                .and_then(MediaType::from_content_type)
        })
    }

    /// Sort key for listings: newest first, missing dates as epoch zero.
    pub fn sort_date(&self) -> DateTime<Utc> {
        self.upload_date.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Whether this record is identified by the given blob identifier via
    /// any of its name fields (`blobName`, `fileName`, or legacy `name`).
    pub fn matches_name(&self, needle: &str) -> bool {
        self.blob_name.as_deref() == Some(needle)
            || self.file_name.as_deref() == Some(needle)
            || self.name.as_deref() == Some(needle)
    }
}

/// Partial update applied by [`update`](crate::models) flows; `None` fields
/// are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Supplying a new content type re-derives `mediaType`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_aliases() {
        for alias in ["image", "images", "myimage"] {
            assert_eq!(MediaType::normalize(alias), Some(MediaType::Image));
        }
        for alias in ["audio", "myaudio"] {
            assert_eq!(MediaType::normalize(alias), Some(MediaType::Audio));
        }
        for alias in ["video", "myvideo", "myvideos"] {
            assert_eq!(MediaType::normalize(alias), Some(MediaType::Video));
        }
        assert_eq!(MediaType::normalize("bogus"), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for alias in ["images", "myimage", "myaudio", "myvideos", "video"] {
            let once = MediaType::normalize(alias).unwrap();
            let twice = MediaType::normalize(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_from_content_type() {
        assert_eq!(
            MediaType::from_content_type("image/png"),
            Some(MediaType::Image)
        );
        assert_eq!(
            MediaType::from_content_type("video/quicktime"),
            Some(MediaType::Video)
        );
        assert_eq!(MediaType::from_content_type("application/pdf"), None);
        assert_eq!(MediaType::from_content_type(""), None);
    }

    #[test]
    fn test_type_filter_parse() {
        assert_eq!(TypeFilter::parse("all"), TypeFilter::All);
        assert_eq!(
            TypeFilter::parse("myvideos"),
            TypeFilter::Only(MediaType::Video)
        );
        assert_eq!(
            TypeFilter::parse("bogus"),
            TypeFilter::Unknown("bogus".to_string())
        );
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let json = serde_json::json!({
            "id": "1700000000000-catjpg",
            "mediaType": "images",
            "fileName": "cat.jpg",
            "blobName": "1700000000000-cat.jpg",
            "_rid": "opaque-provider-field",
            "customFlag": true,
        });
        let record: MediaRecord = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(record.normalized_type(), Some(MediaType::Image));
        assert_eq!(record.extra.get("_rid").unwrap(), "opaque-provider-field");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back.get("_rid"), json.get("_rid"));
        assert_eq!(back.get("customFlag"), json.get("customFlag"));
    }

    #[test]
    fn test_sort_date_missing_is_epoch() {
        let record: MediaRecord = serde_json::from_value(serde_json::json!({"id": "x"})).unwrap();
        assert_eq!(record.sort_date(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_matches_name_checks_all_aliases() {
        let record: MediaRecord = serde_json::from_value(serde_json::json!({
            "id": "a",
            "blobName": "171-cat.jpg",
            "fileName": "cat.jpg",
            "name": "legacy-cat",
        }))
        .unwrap();
        assert!(record.matches_name("171-cat.jpg"));
        assert!(record.matches_name("cat.jpg"));
        assert!(record.matches_name("legacy-cat"));
        assert!(!record.matches_name("dog.jpg"));
    }
}
