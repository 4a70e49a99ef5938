//! Analysis request parameters and result models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::video::VideoId;

/// Maximum number of topics returned by topic extraction.
pub const MAX_TOPICS: usize = 7;

/// Error returned when parsing a request enum from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Output language for generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    De,
    /// Let the model choose the output language from context
    Infer,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Infer => "infer",
        }
    }

    /// Language name used in prompt instructions, `None` for [`Language::Infer`].
    pub fn display_name(&self) -> Option<&'static str> {
        match self {
            Self::En => Some("English"),
            Self::Es => Some("Spanish"),
            Self::Fr => Some("French"),
            Self::De => Some("German"),
            Self::Infer => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            "fr" => Ok(Self::Fr),
            "de" => Ok(Self::De),
            "infer" => Ok(Self::Infer),
            _ => Err(ParseEnumError {
                kind: "language",
                value: s.to_string(),
            }),
        }
    }
}

/// Verbosity tier for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Concise,
    Detailed,
}

impl SummaryStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concise => "concise",
            Self::Detailed => "detailed",
        }
    }

    /// Approximate target length of a summary in words.
    pub fn target_words(&self) -> u32 {
        match self {
            Self::Concise => 100,
            Self::Detailed => 200,
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStyle {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concise" => Ok(Self::Concise),
            "detailed" => Ok(Self::Detailed),
            _ => Err(ParseEnumError {
                kind: "summary style",
                value: s.to_string(),
            }),
        }
    }
}

/// Pipeline stage that talks to a model backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transcription,
    FrameDescriptions,
    TranscriptSummary,
    HolisticSummary,
    TopicExtraction,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcription => "transcription",
            Self::FrameDescriptions => "frame_descriptions",
            Self::TranscriptSummary => "transcript_summary",
            Self::HolisticSummary => "holistic_summary",
            Self::TopicExtraction => "topic_extraction",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model-generated description of one retained keyframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FrameDescription {
    /// Zero-based keyframe index
    pub frame_index: u32,
    /// Keyframe file name inside the video's keyframes directory
    pub image: String,
    /// Description text
    pub description: String,
}

/// Combined output of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub video_id: VideoId,
    pub language: Language,
    pub style: SummaryStyle,
    pub transcript: String,
    pub transcript_summary: String,
    pub holistic_summary: String,
    /// At most [`MAX_TOPICS`] entries
    pub topics: Vec<String>,
    /// Ordered by frame index
    pub frame_descriptions: Vec<FrameDescription>,
    /// Stages whose model call failed and fell back to an empty value
    #[serde(default)]
    pub degraded_stages: Vec<Stage>,
}

impl AnalysisResult {
    /// Returns true if every stage produced a model-generated value.
    pub fn is_complete(&self) -> bool {
        self.degraded_stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parsing() {
        assert_eq!("es".parse::<Language>().unwrap(), Language::Es);
        assert_eq!("INFER".parse::<Language>().unwrap(), Language::Infer);
        assert!("it".parse::<Language>().is_err());
        assert_eq!(Language::Infer.display_name(), None);
        assert_eq!(Language::De.display_name(), Some("German"));
    }

    #[test]
    fn test_language_serde() {
        let lang: Language = serde_json::from_str("\"fr\"").unwrap();
        assert_eq!(lang, Language::Fr);
        assert_eq!(serde_json::to_string(&Language::Infer).unwrap(), "\"infer\"");
    }

    #[test]
    fn test_summary_style() {
        assert_eq!("Detailed".parse::<SummaryStyle>().unwrap(), SummaryStyle::Detailed);
        assert_eq!(SummaryStyle::Concise.target_words(), 100);
        assert_eq!(SummaryStyle::Detailed.target_words(), 200);
        assert!("verbose".parse::<SummaryStyle>().is_err());
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Stage::FrameDescriptions).unwrap(),
            "\"frame_descriptions\""
        );
        assert_eq!(Stage::TopicExtraction.to_string(), "topic_extraction");
    }
}
