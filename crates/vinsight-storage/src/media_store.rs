//! Media store: one directory per uploaded video.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use vinsight_models::{VideoId, VideoRecord};

use crate::error::{StorageError, StorageResult};
use crate::fs_utils::write_atomic;
use crate::layout::{
    is_keyframe_name, Artifact, AUDIO_FILE, KEYFRAMES_DIR, RECORD_FILE, RESERVED_NAMES,
};

/// Maximum length of a stored filename.
pub const MAX_FILENAME_LEN: usize = 128;

/// Make an uploaded filename safe to use as a single path component.
///
/// Takes the last path component, drops control characters, replaces
/// anything outside `[A-Za-z0-9._-]` with `_`, strips leading dots and caps
/// the length. Empty results and names of derived artifacts are rejected.
pub fn sanitize_filename(raw: &str) -> StorageResult<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = last
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let name: String = cleaned
        .trim_start_matches('.')
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect();

    if name.is_empty() {
        return Err(StorageError::invalid_filename(format!(
            "'{}' has no usable characters",
            raw
        )));
    }
    if RESERVED_NAMES.contains(&name.as_str()) {
        return Err(StorageError::invalid_filename(format!(
            "'{}' is reserved",
            name
        )));
    }

    Ok(name)
}

/// Filesystem-backed store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Create a store over `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store and make sure the root directory exists.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root).await?;
        Ok(store)
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every artifact for `id`.
    pub fn video_dir(&self, id: &VideoId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Expected location of an artifact, whether or not it exists yet.
    ///
    /// Returns `None` for [`Artifact::Video`] when no record is stored, since
    /// the upload's name lives in the record.
    pub async fn artifact_path(&self, id: &VideoId, artifact: Artifact) -> Option<PathBuf> {
        let dir = self.video_dir(id);
        match artifact.fixed_name() {
            Some(name) => Some(dir.join(name)),
            None => {
                let record = self.record(id.as_str()).await?;
                Some(dir.join(record.filename))
            }
        }
    }

    /// Persist an upload under a fresh identifier.
    ///
    /// The raw bytes are written first and `record.json` last, so a record on
    /// disk means the upload is complete. On failure the whole directory is
    /// removed.
    pub async fn store(&self, bytes: &[u8], filename: &str) -> StorageResult<VideoRecord> {
        let filename = sanitize_filename(filename)?;
        let id = VideoId::new();
        let dir = self.video_dir(&id);

        fs::create_dir_all(&dir).await?;

        match self.write_upload(&dir, &id, &filename, bytes).await {
            Ok(record) => {
                info!(
                    video_id = %id,
                    filename = %record.filename,
                    size = bytes.len(),
                    "Stored upload"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(video_id = %id, error = %e, "Upload failed, removing directory");
                if let Err(cleanup) = fs::remove_dir_all(&dir).await {
                    warn!(video_id = %id, error = %cleanup, "Failed to remove partial upload");
                }
                Err(e)
            }
        }
    }

    async fn write_upload(
        &self,
        dir: &Path,
        id: &VideoId,
        filename: &str,
        bytes: &[u8],
    ) -> StorageResult<VideoRecord> {
        write_atomic(dir.join(filename), bytes).await?;

        let record = VideoRecord::new(id.clone(), filename);
        let json = serde_json::to_vec_pretty(&record)?;
        write_atomic(dir.join(RECORD_FILE), &json).await?;

        Ok(record)
    }

    /// Whether a complete upload exists for `id`.
    pub async fn exists(&self, id: &str) -> bool {
        let Some(id) = VideoId::parse(id) else {
            return false;
        };
        fs::try_exists(self.video_dir(&id).join(RECORD_FILE))
            .await
            .unwrap_or(false)
    }

    /// Load the stored record for `id`.
    ///
    /// Malformed identifiers, missing uploads and unreadable records all
    /// yield `None`.
    pub async fn record(&self, id: &str) -> Option<VideoRecord> {
        let id = VideoId::parse(id)?;
        let path = self.video_dir(&id).join(RECORD_FILE);
        let data = fs::read(&path).await.ok()?;
        match serde_json::from_slice(&data) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(video_id = %id, error = %e, "Unreadable video record");
                None
            }
        }
    }

    /// Path of an artifact that exists on disk.
    pub async fn resolve(&self, id: &str, artifact: Artifact) -> Option<PathBuf> {
        if !self.exists(id).await {
            return None;
        }
        let id = VideoId::parse(id)?;
        let path = self.artifact_path(&id, artifact).await?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            Some(path)
        } else {
            debug!(video_id = %id, ?artifact, "Artifact not present");
            None
        }
    }

    /// Resolve a keyframe file for retrieval.
    ///
    /// Only `frame_<digits>.jpg` names are accepted, and the canonical path
    /// must stay inside the video's keyframe directory.
    pub async fn keyframe_path(&self, id: &str, name: &str) -> Option<PathBuf> {
        if !is_keyframe_name(name) {
            return None;
        }
        let keyframes = self.resolve(id, Artifact::Keyframes).await?;

        let base = fs::canonicalize(&keyframes).await.ok()?;
        let path = fs::canonicalize(keyframes.join(name)).await.ok()?;

        if !path.starts_with(&base) {
            warn!(video_id = %id, name = %name, "Keyframe path escapes its directory");
            return None;
        }
        Some(path)
    }

    /// Keyframe directory for `id`, regardless of whether it exists.
    pub fn keyframes_dir(&self, id: &VideoId) -> PathBuf {
        self.video_dir(id).join(KEYFRAMES_DIR)
    }

    /// Audio track location for `id`, regardless of whether it exists.
    pub fn audio_path(&self, id: &VideoId) -> PathBuf {
        self.video_dir(id).join(AUDIO_FILE)
    }
}
