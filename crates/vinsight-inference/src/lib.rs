//! Model inference for the analysis pipeline.
//!
//! This crate provides:
//! - A [`ChatBackend`] abstraction with cloud (OpenAI-compatible) and local
//!   (Ollama) implementations
//! - The [`InferenceGateway`]: frame descriptions, summaries and topics with
//!   schema-validated structured output
//! - The [`Transcriber`] over a [`SpeechBackend`]
//! - Bounded retry with exponential backoff for all backend calls

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ollama;
pub mod openai;
pub mod prompts;
pub mod retry;
pub mod transcriber;

use std::sync::Arc;

pub use backend::{ChatBackend, ChatRequest, ContentPart, ImageData, ResponseSchema};
pub use config::{BackendKind, InferenceConfig};
pub use error::{BackendError, InferenceError, InferenceResult};
pub use gateway::InferenceGateway;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use retry::RetryPolicy;
pub use transcriber::{OpenAiSpeechBackend, SpeechBackend, Transcriber};

/// Build the chat backend selected by configuration.
pub fn build_chat_backend(config: &InferenceConfig) -> InferenceResult<Arc<dyn ChatBackend>> {
    let backend: Arc<dyn ChatBackend> = match config.backend {
        BackendKind::OpenAi => Arc::new(OpenAiBackend::from_config(config)?),
        BackendKind::Ollama => Arc::new(OllamaBackend::from_config(config)?),
    };
    tracing::info!(
        backend = backend.name(),
        model = %config.model,
        vision_model = %config.vision_model,
        "Chat backend ready"
    );
    Ok(backend)
}

/// Build the transcriber for the configured speech endpoint.
pub fn build_transcriber(config: &InferenceConfig) -> InferenceResult<Transcriber> {
    let backend = OpenAiSpeechBackend::from_config(config)?;
    Ok(Transcriber::new(Arc::new(backend)))
}
