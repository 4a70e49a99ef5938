//! Structured analysis logging.

use tracing::{error, info, warn, Span};

use vinsight_models::Stage;

/// Logger carrying the video ID and operation on every event.
#[derive(Debug, Clone)]
pub struct AnalysisLogger {
    video_id: String,
    operation: &'static str,
}

impl AnalysisLogger {
    pub fn new(video_id: impl Into<String>, operation: &'static str) -> Self {
        Self {
            video_id: video_id.into(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = self.operation,
            "Started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = self.operation,
            "Progress: {}", message
        );
    }

    /// A stage failed and its output was replaced by an empty value.
    pub fn log_degraded(&self, stage: Stage, error: &dyn std::error::Error) {
        warn!(
            video_id = %self.video_id,
            operation = self.operation,
            stage = %stage,
            error = %error,
            "Stage degraded to empty output"
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            video_id = %self.video_id,
            operation = self.operation,
            "Failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = self.operation,
            "Completed: {}", message
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Span grouping every event of one run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "analysis",
            video_id = %self.video_id,
            operation = self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_fields() {
        let logger = AnalysisLogger::new("abc-12345", "analyze");
        assert_eq!(logger.video_id(), "abc-12345");
    }
}
