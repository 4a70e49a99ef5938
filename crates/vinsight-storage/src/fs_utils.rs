//! Filesystem helpers for crash-safe writes.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{StorageError, StorageResult};

/// Hidden sibling used while a file is being written.
pub(crate) fn part_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.part", name))
}

/// Write `bytes` to `path` atomically.
///
/// Data goes to a hidden `.part` sibling, is flushed to disk, then renamed
/// into place. Readers never observe a partially written file, and an
/// existing file at `path` is replaced in one step.
pub async fn write_atomic(path: impl AsRef<Path>, bytes: &[u8]) -> StorageResult<()> {
    let path = path.as_ref();
    let part = part_path(path);

    let result = async {
        let mut file = fs::File::create(&part).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&part, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&part).await;
        return Err(StorageError::write_failed(format!(
            "{}: {}",
            path.display(),
            e
        )));
    }

    Ok(())
}
