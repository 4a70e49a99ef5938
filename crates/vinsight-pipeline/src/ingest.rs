//! Upload ingestion: store, extract audio, extract keyframes.

use std::time::Instant;

use tokio::fs;
use tracing::{info, Instrument};

use vinsight_media::{extract_audio, extract_keyframes, FfmpegRunner, KeyframeOptions};
use vinsight_models::{VideoId, VideoRecord};
use vinsight_storage::{Artifact, MediaStore};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::AnalysisLogger;
use crate::metrics;

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub record: VideoRecord,
    /// Keyframes retained after downsampling
    pub keyframes: usize,
}

/// Runs the per-upload ingestion steps.
#[derive(Debug, Clone)]
pub struct IngestionService {
    store: MediaStore,
    runner: FfmpegRunner,
    options: KeyframeOptions,
    max_keyframes: usize,
}

impl IngestionService {
    pub fn new(store: MediaStore, config: &PipelineConfig) -> Self {
        Self {
            store,
            runner: config.ffmpeg_runner(),
            options: config.keyframe_options(),
            max_keyframes: config.max_keyframes,
        }
    }

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    /// Store an upload and derive its audio track and keyframes.
    ///
    /// If derivation fails the stored upload is removed again, so an ID is
    /// only ever handed out for a fully ingested video.
    pub async fn ingest(&self, bytes: &[u8], filename: &str) -> PipelineResult<IngestOutcome> {
        let start = Instant::now();
        let record = self.store.store(bytes, filename).await?;
        let logger = AnalysisLogger::new(record.video_id.as_str(), "ingest");

        let result = self
            .derive(&record.video_id, &logger)
            .instrument(logger.create_span())
            .await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(keyframes) => {
                metrics::record_ingest("success", elapsed);
                metrics::record_keyframes(keyframes);
                logger.log_completion(&format!("{} keyframes retained", keyframes));
                Ok(IngestOutcome { record, keyframes })
            }
            Err(e) => {
                metrics::record_ingest("failure", elapsed);
                logger.log_error(&e.to_string());
                if let Err(cleanup) = fs::remove_dir_all(self.store.video_dir(&record.video_id)).await
                {
                    logger.log_error(&format!("failed to remove upload: {}", cleanup));
                }
                Err(e)
            }
        }
    }

    /// Extract audio and keyframes for an already stored upload.
    async fn derive(&self, id: &VideoId, logger: &AnalysisLogger) -> PipelineResult<usize> {
        let video = self
            .store
            .resolve(id.as_str(), Artifact::Video)
            .await
            .ok_or_else(|| PipelineError::not_found(format!("video {}", id)))?;

        logger.log_start("extracting audio");
        extract_audio(&video, self.store.audio_path(id), &self.runner).await?;

        logger.log_progress("extracting keyframes");
        let keyframes = extract_keyframes(
            &video,
            self.store.keyframes_dir(id),
            self.max_keyframes,
            self.options,
            &self.runner,
        )
        .await?;

        info!(video_id = %id, keyframes, "Ingestion artifacts ready");
        Ok(keyframes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rejected_filename_stores_nothing() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());
        let service = IngestionService::new(store, &PipelineConfig::default());

        let err = service.ingest(b"bytes", "record.json").await.unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_failed_derivation_removes_upload() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());
        let service = IngestionService::new(store, &PipelineConfig::default());

        // Not a decodable video: FFmpeg fails, or is missing entirely
        let err = service.ingest(b"not a video", "clip.mp4").await.unwrap_err();

        assert!(matches!(err, PipelineError::Media(_)));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
