//! Multi-stage analysis of an ingested video.
//!
//! Stages run in dependency order:
//!
//! ```text
//! Validating -> transcript (cache or transcribe) -> TranscriptReady
//!   -> [frame descriptions || transcript summary] -> DescriptionsReady
//!   -> Summarizing: [holistic summary || topics] -> Done
//! ```
//!
//! Transcription failure aborts the analysis. Every other inference stage
//! degrades to an empty value and is listed in `degraded_stages`.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, Instrument};

use vinsight_inference::{InferenceError, InferenceGateway, InferenceResult, Transcriber};
use vinsight_media::{extract_audio, list_frames, FfmpegRunner};
use vinsight_models::{AnalysisResult, Language, Stage, SummaryStyle, VideoId};
use vinsight_storage::{Artifact, MediaStore, TranscriptCache};

use crate::error::{PipelineError, PipelineResult};
use crate::logging::AnalysisLogger;
use crate::metrics;

/// Progress of a single analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Validating,
    TranscriptReady,
    DescriptionsReady,
    Summarizing,
    Done,
}

impl AnalysisPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::TranscriptReady => "transcript_ready",
            Self::DescriptionsReady => "descriptions_ready",
            Self::Summarizing => "summarizing",
            Self::Done => "done",
        }
    }
}

/// Coordinates storage, transcription and inference for one analysis.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    store: MediaStore,
    cache: TranscriptCache,
    transcriber: Transcriber,
    gateway: InferenceGateway,
    runner: FfmpegRunner,
}

impl AnalysisOrchestrator {
    pub fn new(
        store: MediaStore,
        transcriber: Transcriber,
        gateway: InferenceGateway,
        runner: FfmpegRunner,
    ) -> Self {
        let cache = TranscriptCache::new(store.root());
        Self {
            store,
            cache,
            transcriber,
            gateway,
            runner,
        }
    }

    /// Analyze a stored video.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NotFound`] if the video or its keyframes are
    ///   missing; no inference call is made
    /// - [`PipelineError::Inference`] / [`PipelineError::Media`] if the
    ///   transcript cannot be produced
    pub async fn analyze(
        &self,
        video_id: &str,
        language: Language,
        style: SummaryStyle,
    ) -> PipelineResult<AnalysisResult> {
        let logger = AnalysisLogger::new(video_id, "analyze");
        let start = Instant::now();

        let result = self
            .run(video_id, language, style, &logger)
            .instrument(logger.create_span())
            .await;

        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(analysis) => {
                metrics::record_analysis("success", elapsed);
                logger.log_completion(&format!(
                    "{} frames, {} topics, {} degraded stages",
                    analysis.frame_descriptions.len(),
                    analysis.topics.len(),
                    analysis.degraded_stages.len()
                ));
            }
            Err(e) => {
                metrics::record_analysis("failure", elapsed);
                logger.log_error(&e.to_string());
            }
        }
        result
    }

    async fn run(
        &self,
        video_id: &str,
        language: Language,
        style: SummaryStyle,
        logger: &AnalysisLogger,
    ) -> PipelineResult<AnalysisResult> {
        self.enter(logger, AnalysisPhase::Validating);
        let id = VideoId::parse(video_id)
            .ok_or_else(|| PipelineError::not_found(format!("video {}", video_id)))?;
        if !self.store.exists(id.as_str()).await {
            return Err(PipelineError::not_found(format!("video {}", id)));
        }
        let keyframes_dir = self
            .store
            .resolve(id.as_str(), Artifact::Keyframes)
            .await
            .ok_or_else(|| PipelineError::not_found(format!("keyframes for video {}", id)))?;
        let frames: Vec<PathBuf> = list_frames(&keyframes_dir)
            .await?
            .into_iter()
            .map(|(_, path)| path)
            .collect();

        let transcript = self.transcript(&id, logger).await?;
        self.enter(logger, AnalysisPhase::TranscriptReady);

        let mut degraded = Vec::new();

        let (descriptions, transcript_summary) = tokio::join!(
            self.gateway.describe(&frames, language),
            self.gateway.summarize(&transcript, style, language),
        );
        let frame_descriptions = degrade(
            descriptions,
            Stage::FrameDescriptions,
            logger,
            &mut degraded,
        );
        let transcript_summary = degrade(
            transcript_summary,
            Stage::TranscriptSummary,
            logger,
            &mut degraded,
        );
        self.enter(logger, AnalysisPhase::DescriptionsReady);

        let description_texts: Vec<String> = frame_descriptions
            .iter()
            .map(|d| d.description.clone())
            .collect();

        self.enter(logger, AnalysisPhase::Summarizing);
        let (holistic, topics) = tokio::join!(
            self.gateway
                .summarize_holistic(&transcript, &description_texts, style, language),
            self.gateway
                .extract_topics(&transcript, &description_texts, language),
        );
        let holistic_summary = degrade(holistic, Stage::HolisticSummary, logger, &mut degraded);
        let topics = degrade(topics, Stage::TopicExtraction, logger, &mut degraded);

        self.enter(logger, AnalysisPhase::Done);
        Ok(AnalysisResult {
            video_id: id,
            language,
            style,
            transcript,
            transcript_summary,
            holistic_summary,
            topics,
            frame_descriptions,
            degraded_stages: degraded,
        })
    }

    /// Cached transcript, or a fresh one that is then cached.
    ///
    /// Two analyses of the same video racing here may both transcribe; the
    /// later write wins and both results are valid.
    async fn transcript(&self, id: &VideoId, logger: &AnalysisLogger) -> PipelineResult<String> {
        if let Some(transcript) = self.cache.get(id).await {
            metrics::record_transcript_cache(true);
            logger.log_progress("transcript cache hit");
            return Ok(transcript);
        }
        metrics::record_transcript_cache(false);

        let audio = self.store.audio_path(id);
        if self.store.resolve(id.as_str(), Artifact::Audio).await.is_none() {
            logger.log_progress("audio missing, re-extracting from upload");
            let video = self
                .store
                .resolve(id.as_str(), Artifact::Video)
                .await
                .ok_or_else(|| PipelineError::not_found(format!("upload for video {}", id)))?;
            extract_audio(&video, &audio, &self.runner).await?;
        }

        logger.log_progress("transcribing audio");
        let transcript = self
            .transcriber
            .transcribe(&audio)
            .await
            .map_err(|e| match e {
                InferenceError::NotFound(_) => {
                    PipelineError::not_found(format!("audio for video {}", id))
                }
                e => PipelineError::from(e),
            })?;

        // A failed cache write costs a re-transcription later, not this result
        if let Err(e) = self.cache.put(id, &transcript).await {
            logger.log_error(&format!("failed to cache transcript: {}", e));
        }
        Ok(transcript)
    }

    fn enter(&self, logger: &AnalysisLogger, phase: AnalysisPhase) {
        debug!(video_id = %logger.video_id(), phase = phase.as_str(), "Analysis phase");
    }
}

/// Unwrap a stage result, recording the stage as degraded on failure.
fn degrade<T: Default>(
    result: InferenceResult<T>,
    stage: Stage,
    logger: &AnalysisLogger,
    degraded: &mut Vec<Stage>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            logger.log_degraded(stage, &e);
            metrics::record_degraded(stage);
            degraded.push(stage);
            T::default()
        }
    }
}
