//! Pipeline error types.

use thiserror::Error;

use vinsight_inference::InferenceError;
use vinsight_media::MediaError;
use vinsight_storage::StorageError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by ingestion and analysis.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),
}

/// Error category exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Media,
    Inference,
    Storage,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Media => "media",
            Self::Inference => "inference",
            Self::Storage => "storage",
            Self::Internal => "internal",
        }
    }
}

impl PipelineError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Media(MediaError::FileNotFound(_)) => ErrorKind::NotFound,
            Self::Media(MediaError::InvalidInput(_)) => ErrorKind::Validation,
            Self::Media(MediaError::FfmpegNotFound | MediaError::Internal(_)) => {
                ErrorKind::Internal
            }
            Self::Media(_) => ErrorKind::Media,
            Self::Storage(StorageError::NotFound(_)) => ErrorKind::NotFound,
            Self::Storage(e) if e.is_client_error() => ErrorKind::Validation,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Inference(InferenceError::NotFound(_)) => ErrorKind::NotFound,
            Self::Inference(InferenceError::Config(_)) => ErrorKind::Internal,
            Self::Inference(_) => ErrorKind::Inference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vinsight_inference::BackendError;
    use vinsight_models::Stage;

    #[test]
    fn test_kinds() {
        assert_eq!(PipelineError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(
            PipelineError::from(MediaError::ffmpeg_failed("bad", None, Some(1))).kind(),
            ErrorKind::Media
        );
        assert_eq!(
            PipelineError::from(MediaError::FfmpegNotFound).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            PipelineError::from(StorageError::invalid_filename("..")).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            PipelineError::from(StorageError::write_failed("disk full")).kind(),
            ErrorKind::Storage
        );
        assert_eq!(
            PipelineError::from(InferenceError::NotFound(PathBuf::from("a.wav"))).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PipelineError::from(InferenceError::backend(
                Stage::Transcription,
                BackendError::Timeout(100)
            ))
            .kind(),
            ErrorKind::Inference
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
        assert_eq!(ErrorKind::Inference.as_str(), "inference");
    }
}
