//! Shared data models for the video analysis pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video identifiers and stored video records
//! - Analysis request parameters (language, summary style)
//! - Frame descriptions and the assembled analysis result
//! - Inference stage names used in logs and degraded-stage reporting

pub mod analysis;
pub mod video;

// Re-export common types
pub use analysis::{
    AnalysisResult, FrameDescription, Language, ParseEnumError, Stage, SummaryStyle, MAX_TOPICS,
};
pub use video::{VideoId, VideoRecord};
