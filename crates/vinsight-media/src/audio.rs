//! Audio track extraction.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner, Overwrite};
use crate::error::{MediaError, MediaResult};

/// PCM codec for extracted audio (16-bit signed little endian).
pub const AUDIO_CODEC: &str = "pcm_s16le";

/// Sample rate for extracted audio in Hz.
pub const AUDIO_SAMPLE_RATE: u32 = 16_000;

/// Channel count for extracted audio.
pub const AUDIO_CHANNELS: u8 = 1;

/// Extract a mono 16 kHz PCM WAV track from a video file.
///
/// An existing output is never overwritten: if `audio_path` already exists the
/// call is a no-op and returns the path. FFmpeg writes to a sibling partial file
/// that is renamed into place on success, so a failed run never leaves a file
/// at `audio_path`.
///
/// # Errors
///
/// - [`MediaError::FileNotFound`] if the video does not exist
/// - [`MediaError::FfmpegFailed`] if FFmpeg exits non-zero (corrupt or
///   unsupported container, no audio stream)
/// - [`MediaError::Timeout`] if the runner's timeout expires
pub async fn extract_audio(
    video_path: impl AsRef<Path>,
    audio_path: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    let video_path = video_path.as_ref();
    let audio_path = audio_path.as_ref();

    if !fs::try_exists(video_path).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(video_path.to_path_buf()));
    }

    if fs::try_exists(audio_path).await.unwrap_or(false) {
        debug!(path = %audio_path.display(), "Audio already extracted, skipping");
        return Ok(audio_path.to_path_buf());
    }

    info!(
        video = %video_path.display(),
        audio = %audio_path.display(),
        "Extracting audio"
    );

    let partial = partial_path(audio_path);
    if fs::try_exists(&partial).await.unwrap_or(false) {
        fs::remove_file(&partial).await?;
    }

    let cmd = FfmpegCommand::new(video_path, &partial)
        .overwrite(Overwrite::Never)
        .no_video()
        .audio_codec(AUDIO_CODEC)
        .sample_rate(AUDIO_SAMPLE_RATE)
        .channels(AUDIO_CHANNELS)
        .option("-f", "wav");

    if let Err(e) = runner.run(&cmd).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e);
    }

    fs::rename(&partial, audio_path).await?;
    debug!(path = %audio_path.display(), "Audio extraction complete");

    Ok(audio_path.to_path_buf())
}

/// Hidden sibling used while FFmpeg is writing.
fn partial_path(audio_path: &Path) -> PathBuf {
    let name = audio_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio.wav".to_string());
    audio_path.with_file_name(format!(".{}.partial", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_source_is_file_not_found() {
        let dir = TempDir::new().unwrap();
        let result = extract_audio(
            dir.path().join("missing.mp4"),
            dir.path().join("audio.wav"),
            &FfmpegRunner::new(),
        )
        .await;

        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
        assert!(!dir.path().join("audio.wav").exists());
    }

    #[tokio::test]
    async fn test_existing_output_is_noop() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("video.mp4");
        let audio = dir.path().join("audio.wav");
        fs::write(&video, b"not really a video").await.unwrap();
        fs::write(&audio, b"existing audio").await.unwrap();

        // Returns before FFmpeg is ever spawned
        let path = extract_audio(&video, &audio, &FfmpegRunner::new()).await.unwrap();

        assert_eq!(path, audio);
        assert_eq!(fs::read(&audio).await.unwrap(), b"existing audio");
    }

    #[test]
    fn test_partial_path_is_hidden_sibling() {
        let p = partial_path(Path::new("/data/abc/audio.wav"));
        assert_eq!(p, PathBuf::from("/data/abc/.audio.wav.partial"));
    }
}
