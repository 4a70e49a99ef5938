//! Inference error types.

use std::path::PathBuf;

use thiserror::Error;
use vinsight_models::Stage;

/// Result type for inference operations.
pub type InferenceResult<T> = Result<T, InferenceError>;

/// Transport-level failure talking to a model backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

impl BackendError {
    /// Map a reqwest error, distinguishing client-side timeouts.
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_secs)
        } else {
            Self::Network(err)
        }
    }

    /// Whether the request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse(_) => false,
        }
    }
}

/// Errors from the inference gateway and transcriber.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{stage} failed: {source}")]
    Backend {
        stage: Stage,
        #[source]
        source: BackendError,
    },

    #[error("{stage} returned unexpected output: {detail}")]
    SchemaMismatch { stage: Stage, detail: String },

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Inference configuration error: {0}")]
    Config(String),
}

impl InferenceError {
    pub fn backend(stage: Stage, source: BackendError) -> Self {
        Self::Backend { stage, source }
    }

    pub fn schema_mismatch(stage: Stage, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            stage,
            detail: detail.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stage the failure is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Backend { stage, .. } | Self::SchemaMismatch { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
