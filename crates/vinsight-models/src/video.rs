//! Video identity and stored record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of an uploaded video; doubles as its storage directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Fresh random identifier (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap a string without checking it. Only for values read back from
    /// trusted storage; untrusted input goes through [`VideoId::parse`].
    pub fn unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Parse an untrusted string, returning `None` if it is not a valid ID.
    pub fn parse(s: &str) -> Option<Self> {
        Self::is_valid(s).then(|| Self(s.to_string()))
    }

    /// 8 to 64 ASCII letters, digits or hyphens.
    ///
    /// Anything else could escape the storage root when used as a path
    /// component.
    pub fn is_valid(id: &str) -> bool {
        (8..=64).contains(&id.len())
            && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Record of an uploaded video, written once the raw upload is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique video ID
    pub video_id: VideoId,

    /// Sanitized original filename (the raw upload's file name on disk)
    pub filename: String,

    /// Upload timestamp
    pub created_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a new record stamped with the current time.
    pub fn new(video_id: VideoId, filename: impl Into<String>) -> Self {
        Self {
            video_id,
            filename: filename.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique_and_valid() {
        let id1 = VideoId::new();
        let id2 = VideoId::new();
        assert_ne!(id1, id2);
        assert!(VideoId::is_valid(id1.as_str()));
    }

    #[test]
    fn test_id_format_rules() {
        assert!(VideoId::is_valid("12345678"));
        assert!(VideoId::is_valid("abc-def-123-456"));
        assert!(!VideoId::is_valid("short"));
        assert!(!VideoId::is_valid("has/slash/in/it"));
        assert!(!VideoId::is_valid("has..dots..in"));
        assert!(!VideoId::is_valid(&"a".repeat(65)));
    }

    #[test]
    fn test_parse_rejects_traversal() {
        assert!(VideoId::parse("../../etc/passwd").is_none());
        assert_eq!(
            VideoId::parse("0b5f8a2e-1111-4c2d-9a3b-aaaaaaaaaaaa").map(|id| id.to_string()),
            Some("0b5f8a2e-1111-4c2d-9a3b-aaaaaaaaaaaa".to_string())
        );
    }

    #[test]
    fn test_record_serde() {
        let record = VideoRecord::new(VideoId::unchecked("abcdefgh"), "clip.mp4");
        let json = serde_json::to_string(&record).unwrap();
        let back: VideoRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
