//! Per-video directory layout.
//!
//! ```text
//! <root>/<video_id>/
//!   <original-filename>
//!   record.json
//!   audio.wav
//!   keyframes/frame_00.jpg ..
//!   data.json
//! ```

/// Completion marker and metadata for a stored upload.
pub const RECORD_FILE: &str = "record.json";
/// Extracted audio track.
pub const AUDIO_FILE: &str = "audio.wav";
/// Keyframe directory.
pub const KEYFRAMES_DIR: &str = "keyframes";
/// Transcript cache.
pub const TRANSCRIPT_FILE: &str = "data.json";

/// Names an upload may not take, since they collide with derived artifacts.
pub const RESERVED_NAMES: [&str; 4] = [RECORD_FILE, AUDIO_FILE, KEYFRAMES_DIR, TRANSCRIPT_FILE];

/// An artifact stored under a video's directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// The raw upload, stored under its sanitized original name
    Video,
    Record,
    Audio,
    Keyframes,
    TranscriptData,
}

impl Artifact {
    /// Fixed file or directory name. `None` for the upload itself, whose name
    /// comes from the record.
    pub fn fixed_name(self) -> Option<&'static str> {
        match self {
            Self::Video => None,
            Self::Record => Some(RECORD_FILE),
            Self::Audio => Some(AUDIO_FILE),
            Self::Keyframes => Some(KEYFRAMES_DIR),
            Self::TranscriptData => Some(TRANSCRIPT_FILE),
        }
    }
}

/// Whether `name` looks like a keyframe file (`frame_<digits>.jpg`).
pub fn is_keyframe_name(name: &str) -> bool {
    name.strip_prefix("frame_")
        .and_then(|rest| rest.strip_suffix(".jpg"))
        .map(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyframe_names() {
        assert!(is_keyframe_name("frame_00.jpg"));
        assert!(is_keyframe_name("frame_123.jpg"));
        assert!(!is_keyframe_name("frame_.jpg"));
        assert!(!is_keyframe_name("frame_01.png"));
        assert!(!is_keyframe_name("../frame_01.jpg"));
        assert!(!is_keyframe_name("frame_0/../../x.jpg"));
    }

    #[test]
    fn test_fixed_names_are_reserved() {
        for artifact in [
            Artifact::Record,
            Artifact::Audio,
            Artifact::Keyframes,
            Artifact::TranscriptData,
        ] {
            let name = artifact.fixed_name().unwrap();
            assert!(RESERVED_NAMES.contains(&name));
        }
        assert!(Artifact::Video.fixed_name().is_none());
    }
}
