//! Scene-change keyframe extraction.
//!
//! FFmpeg's `select='gt(scene,T)'` filter emits one JPEG per visually distinct
//! frame. The emitted set is then downsampled to at most `max_frames` evenly
//! spaced frames and renumbered so the retained files are always
//! `frame_00.jpg .. frame_{k-1}.jpg` with no gaps.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Default scene-change score threshold (0.0-1.0).
pub const DEFAULT_SCENE_THRESHOLD: f64 = 0.3;

const FRAME_PREFIX: &str = "frame_";
const FRAME_EXTENSION: &str = ".jpg";

/// Options for scene-change detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeOptions {
    /// Scene score above which a frame is emitted
    pub scene_threshold: f64,
    /// JPEG quality scale for `-q:v` (2 = best, 31 = worst)
    pub jpeg_quality: u8,
}

impl Default for KeyframeOptions {
    fn default() -> Self {
        Self {
            scene_threshold: DEFAULT_SCENE_THRESHOLD,
            jpeg_quality: 2,
        }
    }
}

/// File name for a keyframe index.
pub fn frame_file_name(index: usize) -> String {
    format!("{}{:02}{}", FRAME_PREFIX, index, FRAME_EXTENSION)
}

/// Parse the index out of a keyframe file name (`frame_07.jpg` -> 7).
pub fn parse_frame_index(name: &str) -> Option<usize> {
    let digits = name.strip_prefix(FRAME_PREFIX)?.strip_suffix(FRAME_EXTENSION)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Choose which of `n` detected frames to keep, by position.
///
/// When `n > max_frames`, picks `round(i * (n - 1) / (max_frames - 1))` for
/// `i` in `0..max_frames`, which always includes the first and last frame.
/// Rounding is half-up on exact integers. Duplicate positions collapse, so the
/// result may hold fewer than `max_frames` entries.
pub fn select_frame_indices(n: usize, max_frames: usize) -> Vec<usize> {
    if n == 0 || max_frames == 0 {
        return Vec::new();
    }
    if n <= max_frames {
        return (0..n).collect();
    }
    if max_frames == 1 {
        return vec![0];
    }

    let span = n - 1;
    let steps = max_frames - 1;
    (0..max_frames)
        .map(|i| (2 * i * span + steps) / (2 * steps))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// List keyframe files in a directory, sorted by index.
///
/// Files that do not match `frame_<digits>.jpg` are ignored. A missing
/// directory yields an empty list.
pub async fn list_frames(dir: impl AsRef<Path>) -> MediaResult<Vec<(usize, PathBuf)>> {
    let dir = dir.as_ref();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut frames = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if let Some(index) = parse_frame_index(&name.to_string_lossy()) {
            frames.push((index, entry.path()));
        }
    }
    frames.sort_by_key(|(index, _)| *index);
    Ok(frames)
}

/// Downsample the keyframes in `dir` to at most `max_frames`, in place.
///
/// Unselected files are deleted and the survivors renamed to a contiguous
/// 0-based sequence preserving their order. Returns the retained count.
pub async fn retain_evenly_spaced(dir: impl AsRef<Path>, max_frames: usize) -> MediaResult<usize> {
    let dir = dir.as_ref();
    let frames = list_frames(dir).await?;
    let selected: BTreeSet<usize> = select_frame_indices(frames.len(), max_frames)
        .into_iter()
        .collect();

    let mut retained = Vec::with_capacity(selected.len());
    for (position, (_, path)) in frames.into_iter().enumerate() {
        if selected.contains(&position) {
            retained.push(path);
        } else {
            fs::remove_file(&path).await?;
        }
    }

    // Ascending order is collision-free: the target index never exceeds the
    // source index, and every smaller slot is already deleted or renamed.
    for (new_index, path) in retained.iter().enumerate() {
        let target = dir.join(frame_file_name(new_index));
        if *path != target {
            fs::rename(path, &target).await?;
        }
    }

    Ok(retained.len())
}

/// Extract up to `max_frames` scene-change keyframes from a video.
///
/// Any keyframes left in `output_dir` by an earlier run are removed first.
/// A video with no detected scene changes yields `Ok(0)` and an empty
/// directory.
///
/// # Errors
///
/// - [`MediaError::InvalidInput`] if `max_frames` is 0 or the threshold is
///   outside `(0, 1)`
/// - [`MediaError::FileNotFound`] if the video does not exist
/// - [`MediaError::Io`] if the output directory cannot be created
/// - [`MediaError::FfmpegFailed`] / [`MediaError::Timeout`] from FFmpeg
pub async fn extract_keyframes(
    video_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    max_frames: usize,
    options: KeyframeOptions,
    runner: &FfmpegRunner,
) -> MediaResult<usize> {
    let video_path = video_path.as_ref();
    let output_dir = output_dir.as_ref();

    if max_frames == 0 {
        return Err(MediaError::invalid_input("max_frames must be at least 1"));
    }
    if !(options.scene_threshold > 0.0 && options.scene_threshold < 1.0) {
        return Err(MediaError::invalid_input(format!(
            "scene threshold must be between 0 and 1, got {}",
            options.scene_threshold
        )));
    }
    if !fs::try_exists(video_path).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(video_path.to_path_buf()));
    }

    fs::create_dir_all(output_dir).await?;
    for (_, stale) in list_frames(output_dir).await? {
        fs::remove_file(stale).await?;
    }

    info!(
        video = %video_path.display(),
        threshold = options.scene_threshold,
        max_frames,
        "Extracting scene-change keyframes"
    );

    let pattern = output_dir.join(format!("{}%02d{}", FRAME_PREFIX, FRAME_EXTENSION));
    let cmd = FfmpegCommand::new(video_path, pattern)
        .video_filter(format!("select='gt(scene,{})'", options.scene_threshold))
        .option("-vsync", "vfr")
        .option("-start_number", "0")
        .option("-q:v", options.jpeg_quality.to_string());

    runner.run(&cmd).await?;

    let detected = list_frames(output_dir).await?.len();
    let retained = retain_evenly_spaced(output_dir, max_frames).await?;

    debug!(detected, retained, "Keyframe selection complete");
    Ok(retained)
}
