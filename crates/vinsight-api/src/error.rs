//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use vinsight_inference::InferenceError;
use vinsight_pipeline::{ErrorKind, PipelineError};

use crate::response::Envelope;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Validation(_) | ApiError::PayloadTooLarge(_) => ErrorKind::Validation,
            ApiError::Internal(_) => ErrorKind::Internal,
            ApiError::Pipeline(e) => e.kind(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        if let ApiError::PayloadTooLarge(_) = self {
            return StatusCode::PAYLOAD_TOO_LARGE;
        }
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Inference => StatusCode::BAD_GATEWAY,
            ErrorKind::Media | ErrorKind::Storage | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to clients.
    ///
    /// Caller-facing errors keep their text. Server-side failures get a fixed
    /// message per kind; the detail only goes to the log.
    fn public_message(&self) -> String {
        match self {
            ApiError::NotFound(_) | ApiError::Validation(_) | ApiError::PayloadTooLarge(_) => {
                self.to_string()
            }
            ApiError::Pipeline(e @ (PipelineError::NotFound(_) | PipelineError::Validation(_))) => {
                e.to_string()
            }
            ApiError::Pipeline(PipelineError::Storage(e)) if e.is_client_error() => e.to_string(),
            ApiError::Pipeline(PipelineError::Inference(
                InferenceError::Backend { stage, .. } | InferenceError::SchemaMismatch { stage, .. },
            )) => format!("The model service failed during {}", stage),
            _ => match self.kind() {
                ErrorKind::NotFound => "Resource not found",
                ErrorKind::Validation => "Invalid request",
                ErrorKind::Media => "Media processing failed",
                ErrorKind::Inference => "The model service failed",
                ErrorKind::Storage => "Storage operation failed",
                ErrorKind::Internal => "An internal error occurred",
            }
            .to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        if status.is_server_error() {
            error!(kind = kind.as_str(), error = %self, "Request failed");
        }

        let body = Envelope::error(kind.as_str(), self.public_message());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vinsight_inference::BackendError;
    use vinsight_media::MediaError;
    use vinsight_models::Stage;
    use vinsight_storage::StorageError;

    #[test]
    fn test_status_codes_follow_kind() {
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::PayloadTooLarge(10).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::from(PipelineError::from(MediaError::ffmpeg_failed("x", None, Some(1))))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(PipelineError::from(StorageError::write_failed("disk")))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(PipelineError::from(InferenceError::backend(
                Stage::Transcription,
                BackendError::Timeout(100)
            )))
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(PipelineError::not_found("video")).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_server_failures_hide_details() {
        let err = ApiError::from(PipelineError::from(StorageError::write_failed(
            "/srv/uploads/abc: disk full",
        )));
        assert_eq!(err.public_message(), "Storage operation failed");

        let err = ApiError::from(PipelineError::from(MediaError::ffmpeg_failed(
            "ffmpeg exited with 1",
            Some("/srv/uploads/abc/video.mp4: Invalid data".to_string()),
            Some(1),
        )));
        assert_eq!(err.public_message(), "Media processing failed");

        let err = ApiError::from(PipelineError::from(InferenceError::backend(
            Stage::Transcription,
            BackendError::Status {
                status: 401,
                body: "Incorrect API key provided: sk-live-abc".to_string(),
            },
        )));
        let message = err.public_message();
        assert!(!message.contains("sk-live"));
        assert!(message.starts_with("The model service failed during"));

        let err = ApiError::from(PipelineError::from(InferenceError::NotFound(
            "/srv/uploads/abc/audio.wav".into(),
        )));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Resource not found");

        assert_eq!(
            ApiError::internal("lock poisoned").public_message(),
            "An internal error occurred"
        );
    }

    #[test]
    fn test_client_errors_keep_their_text() {
        assert_eq!(
            ApiError::validation("unknown language").public_message(),
            "Invalid request: unknown language"
        );
        assert_eq!(
            ApiError::from(PipelineError::from(StorageError::invalid_filename("record.json")))
                .public_message(),
            "Invalid filename: record.json"
        );
        assert_eq!(
            ApiError::from(PipelineError::not_found("video abc")).public_message(),
            "Not found: video abc"
        );
    }
}
