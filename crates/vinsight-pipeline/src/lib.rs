//! Ingestion and analysis pipeline.
//!
//! This crate provides:
//! - [`IngestionService`]: store an upload, extract audio and keyframes
//! - [`AnalysisOrchestrator`]: transcript (cached), frame descriptions,
//!   summaries and topics with per-stage degradation
//! - Pipeline configuration, error taxonomy, structured logging and metrics

pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod orchestrator;

pub use config::{PipelineConfig, MAX_KEYFRAMES_LIMIT};
pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use ingest::{IngestOutcome, IngestionService};
pub use logging::AnalysisLogger;
pub use orchestrator::{AnalysisOrchestrator, AnalysisPhase};
