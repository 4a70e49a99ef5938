//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use vinsight_media::{FfmpegRunner, KeyframeOptions, DEFAULT_SCENE_THRESHOLD};

/// Upper bound on retained keyframes per video.
pub const MAX_KEYFRAMES_LIMIT: usize = 20;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for uploads and derived artifacts
    pub storage_root: PathBuf,
    /// Keyframes kept per video, 1..=20
    pub max_keyframes: usize,
    /// Scene-change threshold for keyframe detection
    pub scene_threshold: f64,
    /// Timeout for each FFmpeg invocation
    pub ffmpeg_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("uploads"),
            max_keyframes: 10,
            scene_threshold: DEFAULT_SCENE_THRESHOLD,
            ffmpeg_timeout: Duration::from_secs(600), // 10 minutes
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            storage_root: lookup("STORAGE_ROOT")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            max_keyframes: lookup("MAX_KEYFRAMES")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.max_keyframes)
                .clamp(1, MAX_KEYFRAMES_LIMIT),
            scene_threshold: lookup("SCENE_THRESHOLD")
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|t| *t > 0.0 && *t < 1.0)
                .unwrap_or(defaults.scene_threshold),
            ffmpeg_timeout: Duration::from_secs(
                lookup("FFMPEG_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }

    pub fn keyframe_options(&self) -> KeyframeOptions {
        KeyframeOptions {
            scene_threshold: self.scene_threshold,
            ..Default::default()
        }
    }

    pub fn ffmpeg_runner(&self) -> FfmpegRunner {
        FfmpegRunner::new().with_timeout(self.ffmpeg_timeout)
    }
}
