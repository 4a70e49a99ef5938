//! Speech-to-text transcription.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info};

use vinsight_models::Stage;

use crate::config::InferenceConfig;
use crate::error::{BackendError, InferenceError, InferenceResult};
use crate::retry::RetryPolicy;

/// A speech recognition service.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transcribe WAV audio bytes to plain text.
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, BackendError>;
}

/// Backend for any OpenAI-compatible `/audio/transcriptions` endpoint,
/// including self-hosted whisper servers.
pub struct OpenAiSpeechBackend {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiSpeechBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> InferenceResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            timeout,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: &InferenceConfig) -> InferenceResult<Self> {
        Ok(Self::new(
            &config.transcribe_base_url,
            config.transcribe_api_key.clone(),
            &config.transcribe_model,
            config.timeout,
        )?
        .with_retry(RetryPolicy::new(config.max_retries)))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn send(&self, audio: &[u8], file_name: &str) -> Result<String, BackendError> {
        let url = format!("{}/audio/transcriptions", self.base_url);

        // Multipart forms are consumed on send, so each attempt builds its own
        let file = Part::bytes(audio.to_vec())
            .file_name(file_name.to_string())
            .mime_str("audio/wav")
            .map_err(BackendError::Network)?;
        let form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", file);

        let mut builder = self.http.post(&url).multipart(form);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, self.timeout.as_secs()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let parsed: TranscriptionResponse = response.json().await.map_err(|e| {
            BackendError::InvalidResponse(format!("malformed transcription: {}", e))
        })?;
        Ok(parsed.text)
    }
}

#[async_trait]
impl SpeechBackend for OpenAiSpeechBackend {
    fn name(&self) -> &'static str {
        "openai-speech"
    }

    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, BackendError> {
        debug!(model = %self.model, bytes = audio.len(), "Sending transcription request");
        self.retry
            .run(Stage::Transcription.as_str(), || self.send(&audio, file_name))
            .await
    }
}

/// Turns an extracted audio track into transcript text.
#[derive(Clone)]
pub struct Transcriber {
    backend: Arc<dyn SpeechBackend>,
}

impl Transcriber {
    pub fn new(backend: Arc<dyn SpeechBackend>) -> Self {
        Self { backend }
    }

    /// Transcribe the audio file at `audio_path`.
    ///
    /// # Errors
    ///
    /// - [`InferenceError::NotFound`] if the file does not exist
    /// - [`InferenceError::Backend`] with [`Stage::Transcription`] if the
    ///   service fails
    pub async fn transcribe(&self, audio_path: &Path) -> InferenceResult<String> {
        let audio = match fs::read(audio_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(InferenceError::NotFound(audio_path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());

        let text = self
            .backend
            .transcribe(audio, &file_name)
            .await
            .map_err(|source| InferenceError::backend(Stage::Transcription, source))?;

        let text = text.trim().to_string();
        info!(
            backend = self.backend.name(),
            chars = text.len(),
            "Transcription complete"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> OpenAiSpeechBackend {
        OpenAiSpeechBackend::new(
            server.uri(),
            Some("sk-test".into()),
            "gpt-4o-mini-transcribe",
            Duration::from_secs(5),
        )
        .unwrap()
        .with_retry(RetryPolicy::new(1).with_base_delay(Duration::from_millis(1)))
    }

    async fn audio_file(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("audio.wav");
        fs::write(&path, b"RIFF....WAVE").await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_transcribe_posts_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "text": " Hello there. " })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let audio = audio_file(&dir).await;
        let transcriber = Transcriber::new(Arc::new(backend(&server)));

        let text = transcriber.transcribe(&audio).await.unwrap();
        assert_eq!(text, "Hello there.");

        let received = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&received[0].body);
        assert!(body.contains("gpt-4o-mini-transcribe"));
        assert!(body.contains("filename=\"audio.wav\""));
    }

    #[tokio::test]
    async fn test_missing_audio_is_not_found() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let transcriber = Transcriber::new(Arc::new(backend(&server)));

        let err = transcriber
            .transcribe(&dir.path().join("audio.wav"))
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::NotFound(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_is_typed_with_cause() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let audio = audio_file(&dir).await;
        let transcriber = Transcriber::new(Arc::new(backend(&server)));

        let err = transcriber.transcribe(&audio).await.unwrap_err();

        match err {
            InferenceError::Backend { stage, source } => {
                assert_eq!(stage, Stage::Transcription);
                assert!(matches!(source, BackendError::Status { status: 500, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // One initial attempt plus one retry
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
