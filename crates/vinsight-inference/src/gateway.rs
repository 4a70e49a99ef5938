//! Inference gateway: the four model-backed analysis operations.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info};

use vinsight_models::{FrameDescription, Language, Stage, SummaryStyle, MAX_TOPICS};

use crate::backend::{ChatBackend, ChatRequest, ImageData, ResponseSchema};
use crate::error::{InferenceError, InferenceResult};
use crate::prompts;

/// Structured output for frame descriptions.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct DescriptionsOutput {
    descriptions: Vec<DescriptionItem>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct DescriptionItem {
    /// 0-based index of the frame as labelled in the request
    frame_index: u32,
    description: String,
}

/// Structured output for topic extraction.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct TopicsOutput {
    topics: Vec<String>,
}

/// Routes analysis requests to the configured chat backend.
#[derive(Clone)]
pub struct InferenceGateway {
    backend: Arc<dyn ChatBackend>,
}

impl InferenceGateway {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Describe each image, in the order given.
    ///
    /// Returns one description per image with `frame_index` matching the
    /// image's position. An empty input makes no backend call.
    pub async fn describe(
        &self,
        images: &[PathBuf],
        language: Language,
    ) -> InferenceResult<Vec<FrameDescription>> {
        let stage = Stage::FrameDescriptions;
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = ChatRequest::new(stage)
            .system(prompts::DESCRIBE_SYSTEM)
            .text(prompts::describe_frames(images.len(), language))
            .schema(ResponseSchema::for_type::<DescriptionsOutput>("image_descriptions"))
            .temperature(0.4)
            .max_tokens(1000);

        let mut names = Vec::with_capacity(images.len());
        for (index, path) in images.iter().enumerate() {
            let bytes = match fs::read(path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(InferenceError::NotFound(path.clone()))
                }
                Err(e) => return Err(e.into()),
            };
            names.push(
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );
            request = request
                .text(prompts::frame_label(index))
                .image(ImageData::jpeg(&bytes));
        }

        let raw = self.call(&request).await?;
        let output: DescriptionsOutput = parse_structured(stage, &raw)?;
        let descriptions = validate_descriptions(output, &names)?;

        info!(frames = descriptions.len(), "Frame descriptions generated");
        Ok(descriptions)
    }

    /// Summarize a transcript.
    pub async fn summarize(
        &self,
        text: &str,
        style: SummaryStyle,
        language: Language,
    ) -> InferenceResult<String> {
        let request = ChatRequest::new(Stage::TranscriptSummary)
            .system(prompts::SUMMARY_SYSTEM)
            .text(prompts::transcript_summary(text, style, language))
            .temperature(0.2)
            .max_tokens(summary_tokens(style));

        Ok(self.call(&request).await?.trim().to_string())
    }

    /// Summarize the whole video from its transcript and frame descriptions.
    pub async fn summarize_holistic(
        &self,
        text: &str,
        descriptions: &[String],
        style: SummaryStyle,
        language: Language,
    ) -> InferenceResult<String> {
        let request = ChatRequest::new(Stage::HolisticSummary)
            .system(prompts::SUMMARY_SYSTEM)
            .text(prompts::holistic_summary(text, descriptions, style, language))
            .temperature(0.2)
            .max_tokens(summary_tokens(style));

        Ok(self.call(&request).await?.trim().to_string())
    }

    /// Extract at most [`MAX_TOPICS`] topic tags.
    pub async fn extract_topics(
        &self,
        text: &str,
        descriptions: &[String],
        language: Language,
    ) -> InferenceResult<Vec<String>> {
        let stage = Stage::TopicExtraction;
        let request = ChatRequest::new(stage)
            .system(prompts::TOPICS_SYSTEM)
            .text(prompts::topics(text, descriptions, language))
            .schema(ResponseSchema::for_type::<TopicsOutput>("topics"))
            .temperature(0.2)
            .max_tokens(300);

        let raw = self.call(&request).await?;
        let output: TopicsOutput = parse_structured(stage, &raw)?;

        let topics: Vec<String> = output
            .topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .take(MAX_TOPICS)
            .collect();

        debug!(count = topics.len(), "Topics extracted");
        Ok(topics)
    }

    async fn call(&self, request: &ChatRequest) -> InferenceResult<String> {
        self.backend
            .complete(request)
            .await
            .map_err(|source| InferenceError::backend(request.stage, source))
    }
}

/// Detailed summaries need more room than the default budget.
fn summary_tokens(style: SummaryStyle) -> u32 {
    match style {
        SummaryStyle::Concise => 300,
        SummaryStyle::Detailed => 500,
    }
}

/// Strip a surrounding markdown code fence, if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn parse_structured<T: DeserializeOwned>(stage: Stage, raw: &str) -> InferenceResult<T> {
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| InferenceError::schema_mismatch(stage, e.to_string()))
}

/// Check one description per frame and attach file names, ordered by index.
fn validate_descriptions(
    output: DescriptionsOutput,
    names: &[String],
) -> InferenceResult<Vec<FrameDescription>> {
    let stage = Stage::FrameDescriptions;
    let expected = names.len();

    if output.descriptions.len() != expected {
        return Err(InferenceError::schema_mismatch(
            stage,
            format!(
                "expected {} descriptions, got {}",
                expected,
                output.descriptions.len()
            ),
        ));
    }

    let indices: BTreeSet<u32> = output.descriptions.iter().map(|d| d.frame_index).collect();
    let covers_all = indices.len() == expected
        && indices.iter().enumerate().all(|(i, &idx)| idx as usize == i);
    if !covers_all {
        return Err(InferenceError::schema_mismatch(
            stage,
            format!("frame indices {:?} do not cover 0..{}", indices, expected),
        ));
    }

    let mut descriptions: Vec<FrameDescription> = output
        .descriptions
        .into_iter()
        .map(|d| FrameDescription {
            frame_index: d.frame_index,
            image: names[d.frame_index as usize].clone(),
            description: d.description.trim().to_string(),
        })
        .collect();
    descriptions.sort_by_key(|d| d.frame_index);
    Ok(descriptions)
}
