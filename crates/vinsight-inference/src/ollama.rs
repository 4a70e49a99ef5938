//! Local Ollama chat backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::backend::{ChatBackend, ChatRequest, ContentPart};
use crate::config::InferenceConfig;
use crate::error::{BackendError, InferenceError, InferenceResult};
use crate::retry::RetryPolicy;

/// Backend for a local Ollama server (`/api/chat`).
///
/// Structured output is requested by passing the JSON schema as `format`.
pub struct OllamaBackend {
    http: Client,
    base_url: String,
    model: String,
    vision_model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

impl OllamaBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> InferenceResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::config(format!("failed to build HTTP client: {}", e)))?;
        let model = model.into();

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            vision_model: model.clone(),
            model,
            timeout,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: &InferenceConfig) -> InferenceResult<Self> {
        Ok(
            Self::new(&config.ollama_base_url, &config.model, config.timeout)?
                .with_vision_model(&config.vision_model)
                .with_retry(RetryPolicy::new(config.max_retries)),
        )
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_body<'a>(&'a self, request: &ChatRequest) -> OllamaChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(OllamaMessage {
                role: "system",
                content: system.clone(),
                images: Vec::new(),
            });
        }

        // Ollama takes images as a flat list next to the message text
        let images = request
            .parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Image(image) => Some(image.base64.clone()),
                ContentPart::Text(_) => None,
            })
            .collect();
        messages.push(OllamaMessage {
            role: "user",
            content: request.joined_text(),
            images,
        });

        OllamaChatRequest {
            model: if request.has_images() {
                &self.vision_model
            } else {
                &self.model
            },
            messages,
            stream: false,
            format: request.schema.as_ref().map(|s| s.schema.clone()),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    async fn send(&self, body: &OllamaChatRequest<'_>) -> Result<String, BackendError> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, self.timeout.as_secs()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("malformed chat response: {}", e)))?;

        parsed
            .message
            .map(|m| m.content)
            .ok_or_else(|| BackendError::InvalidResponse("no message in chat response".into()))
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let body = self.build_body(request);
        debug!(
            stage = %request.stage,
            model = body.model,
            images = body.messages.last().map(|m| m.images.len()).unwrap_or(0),
            "Sending Ollama chat request"
        );
        self.retry
            .run(request.stage.as_str(), || self.send(&body))
            .await
    }
}
