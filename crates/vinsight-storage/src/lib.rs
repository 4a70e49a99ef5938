//! Local filesystem storage for uploaded videos and their derived artifacts.
//!
//! This crate provides:
//! - Per-video directory layout under a single storage root
//! - Upload persistence with a completion marker (`record.json`)
//! - Safe path resolution for derived artifacts and keyframes
//! - Transcript cache (`data.json`)

pub mod error;
pub mod fs_utils;
pub mod layout;
pub mod media_store;
pub mod transcript_cache;

pub use error::{StorageError, StorageResult};
pub use layout::{is_keyframe_name, Artifact, RESERVED_NAMES};
pub use media_store::{sanitize_filename, MediaStore, MAX_FILENAME_LEN};
pub use transcript_cache::TranscriptCache;
