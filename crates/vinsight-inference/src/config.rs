//! Inference backend configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{InferenceError, InferenceResult};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_TRANSCRIBE_MODEL: &str = "gpt-4o-mini-transcribe";

/// Which chat backend serves inference requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// OpenAI-compatible cloud API
    OpenAi,
    /// Local Ollama server
    Ollama,
}

impl FromStr for BackendKind {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "cloud" => Ok(Self::OpenAi),
            "ollama" | "local" => Ok(Self::Ollama),
            other => Err(InferenceError::config(format!(
                "unknown LLM_BACKEND '{}', expected openai|cloud|ollama|local",
                other
            ))),
        }
    }
}

/// Inference configuration.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub backend: BackendKind,
    /// Model for text-only requests
    pub model: String,
    /// Model for requests carrying images
    pub vision_model: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub ollama_base_url: String,
    pub transcribe_model: String,
    /// OpenAI-compatible transcription endpoint base (cloud or local whisper)
    pub transcribe_base_url: String,
    pub transcribe_api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl InferenceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> InferenceResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> InferenceResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend: BackendKind = get("LLM_BACKEND")
            .ok_or_else(|| InferenceError::config("LLM_BACKEND not set"))?
            .parse()?;
        let model = get("LLM_MODEL").ok_or_else(|| InferenceError::config("LLM_MODEL not set"))?;
        let vision_model = get("LLM_VISION_MODEL").unwrap_or_else(|| model.clone());

        let openai_api_key = get("OPENAI_API_KEY");
        if backend == BackendKind::OpenAi && openai_api_key.is_none() {
            return Err(InferenceError::config(
                "OPENAI_API_KEY is required for the cloud backend",
            ));
        }

        let openai_base_url = get("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let ollama_base_url = get("OLLAMA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let transcribe_base_url = get("TRANSCRIBE_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| openai_base_url.clone());

        Ok(Self {
            backend,
            model,
            vision_model,
            transcribe_model: get("TRANSCRIBE_MODEL")
                .unwrap_or_else(|| DEFAULT_TRANSCRIBE_MODEL.to_string()),
            transcribe_api_key: get("TRANSCRIBE_API_KEY").or_else(|| openai_api_key.clone()),
            openai_api_key,
            openai_base_url,
            ollama_base_url,
            transcribe_base_url,
            timeout: Duration::from_secs(
                get("INFERENCE_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
            ),
            max_retries: get("INFERENCE_MAX_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> InferenceResult<InferenceConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        InferenceConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_cloud_defaults() {
        let config = load(&[
            ("LLM_BACKEND", "cloud"),
            ("LLM_MODEL", "gpt-4o-mini"),
            ("OPENAI_API_KEY", "sk-test"),
        ])
        .unwrap();

        assert_eq!(config.backend, BackendKind::OpenAi);
        assert_eq!(config.vision_model, "gpt-4o-mini");
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.transcribe_base_url, config.openai_base_url);
        assert_eq!(config.transcribe_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.transcribe_model, "gpt-4o-mini-transcribe");
        assert_eq!(config.timeout, Duration::from_secs(100));
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_local_backend_needs_no_key() {
        let config = load(&[
            ("LLM_BACKEND", "local"),
            ("LLM_MODEL", "llama3.2"),
            ("LLM_VISION_MODEL", "llava"),
            ("OLLAMA_BASE_URL", "http://ollama:11434/"),
            ("TRANSCRIBE_BASE_URL", "http://whisper:8000/v1"),
        ])
        .unwrap();

        assert_eq!(config.backend, BackendKind::Ollama);
        assert_eq!(config.vision_model, "llava");
        assert_eq!(config.ollama_base_url, "http://ollama:11434");
        assert_eq!(config.transcribe_base_url, "http://whisper:8000/v1");
        assert!(config.transcribe_api_key.is_none());
    }

    #[test]
    fn test_missing_required_values() {
        assert!(matches!(load(&[]), Err(InferenceError::Config(_))));
        assert!(matches!(
            load(&[("LLM_BACKEND", "ollama")]),
            Err(InferenceError::Config(_))
        ));
        assert!(matches!(
            load(&[("LLM_BACKEND", "openai"), ("LLM_MODEL", "m")]),
            Err(InferenceError::Config(_))
        ));
        assert!(matches!(
            load(&[("LLM_BACKEND", "gemini"), ("LLM_MODEL", "m")]),
            Err(InferenceError::Config(_))
        ));
    }
}
