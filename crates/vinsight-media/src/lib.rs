//! FFmpeg CLI wrapper for media ingestion.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A runner with per-call timeouts and stderr capture for diagnostics
//! - Audio extraction to mono 16 kHz PCM
//! - Scene-change keyframe extraction with deterministic downsampling

pub mod audio;
pub mod command;
pub mod error;
pub mod keyframes;

pub use audio::{extract_audio, AUDIO_CHANNELS, AUDIO_CODEC, AUDIO_SAMPLE_RATE};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner, Overwrite};
pub use error::{MediaError, MediaResult};
pub use keyframes::{
    extract_keyframes, frame_file_name, list_frames, parse_frame_index, retain_evenly_spaced,
    select_frame_indices, KeyframeOptions, DEFAULT_SCENE_THRESHOLD,
};
