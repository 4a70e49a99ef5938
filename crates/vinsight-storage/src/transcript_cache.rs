//! Transcript cache.
//!
//! Stores transcript text next to the upload as `data.json` so repeat
//! analyses of the same video skip transcription.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use vinsight_models::VideoId;

use crate::error::{StorageError, StorageResult};
use crate::fs_utils::write_atomic;
use crate::layout::TRANSCRIPT_FILE;

#[derive(Debug, Serialize, Deserialize)]
struct TranscriptRecord {
    transcript: String,
}

/// File-backed transcript cache keyed by video ID.
#[derive(Debug, Clone)]
pub struct TranscriptCache {
    root: PathBuf,
}

impl TranscriptCache {
    /// Create a cache over the same root as the media store.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, id: &VideoId) -> PathBuf {
        self.root.join(id.as_str()).join(TRANSCRIPT_FILE)
    }

    /// Load a cached transcript.
    ///
    /// Returns `None` if:
    /// - The ID is malformed
    /// - No transcript has been stored
    /// - The stored record is corrupt (treated as a miss)
    pub async fn get(&self, id: &VideoId) -> Option<String> {
        if !VideoId::is_valid(id.as_str()) {
            return None;
        }
        let path = self.path(id);

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) => {
                debug!(video_id = %id, error = %e, "Transcript cache miss");
                return None;
            }
        };

        match serde_json::from_slice::<TranscriptRecord>(&data) {
            Ok(record) => {
                debug!(video_id = %id, "Transcript cache hit");
                Some(record.transcript)
            }
            Err(e) => {
                warn!(video_id = %id, error = %e, "Transcript cache miss (corrupt data)");
                None
            }
        }
    }

    /// Store a transcript, replacing any previous entry.
    ///
    /// The video's directory must already exist.
    pub async fn put(&self, id: &VideoId, transcript: &str) -> StorageResult<()> {
        if !VideoId::is_valid(id.as_str()) {
            return Err(StorageError::invalid_key(id.as_str()));
        }
        let dir = self.root.join(id.as_str());
        if !is_dir(&dir).await {
            return Err(StorageError::not_found(id.as_str()));
        }

        let json = serde_json::to_vec(&TranscriptRecord {
            transcript: transcript.to_string(),
        })?;
        write_atomic(self.path(id), &json).await?;

        debug!(video_id = %id, chars = transcript.len(), "Stored transcript");
        Ok(())
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, TranscriptCache, VideoId) {
        let dir = TempDir::new().unwrap();
        let id = VideoId::new();
        fs::create_dir_all(dir.path().join(id.as_str())).await.unwrap();
        let cache = TranscriptCache::new(dir.path());
        (dir, cache, id)
    }

    #[tokio::test]
    async fn test_get_before_put_is_miss() {
        let (_dir, cache, id) = setup().await;
        assert!(cache.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_is_exact() {
        let (_dir, cache, id) = setup().await;
        let text = "Hola, ¿qué tal?\n\"quoted\" \u{1F600}\n";

        cache.put(&id, text).await.unwrap();

        assert_eq!(cache.get(&id).await.as_deref(), Some(text));
    }

    #[tokio::test]
    async fn test_empty_transcript_is_a_hit() {
        let (_dir, cache, id) = setup().await;
        cache.put(&id, "").await.unwrap();
        assert_eq!(cache.get(&id).await.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_second_put_overwrites() {
        let (_dir, cache, id) = setup().await;
        cache.put(&id, "first").await.unwrap();
        cache.put(&id, "second").await.unwrap();
        assert_eq!(cache.get(&id).await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_survives_new_instance() {
        let (dir, cache, id) = setup().await;
        cache.put(&id, "persisted").await.unwrap();

        let reopened = TranscriptCache::new(dir.path());
        assert_eq!(reopened.get(&id).await.as_deref(), Some("persisted"));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_miss() {
        let (dir, cache, id) = setup().await;
        fs::write(dir.path().join(id.as_str()).join("data.json"), b"{not json")
            .await
            .unwrap();

        assert!(cache.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_put_for_unknown_video_fails() {
        let dir = TempDir::new().unwrap();
        let cache = TranscriptCache::new(dir.path());

        let result = cache.put(&VideoId::new(), "text").await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_malformed_id_rejected() {
        let dir = TempDir::new().unwrap();
        let cache = TranscriptCache::new(dir.path());
        let id = VideoId::unchecked("../escape");

        assert!(cache.get(&id).await.is_none());
        assert!(matches!(
            cache.put(&id, "x").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
