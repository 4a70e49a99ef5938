//! OpenAI-compatible chat completions backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::backend::{ChatBackend, ChatRequest, ContentPart};
use crate::config::InferenceConfig;
use crate::error::{BackendError, InferenceError, InferenceResult};
use crate::retry::RetryPolicy;

/// Cloud backend speaking the `/chat/completions` protocol.
pub struct OpenAiBackend {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    vision_model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAiBackend {
    /// Create a backend against `base_url` (e.g. `https://api.openai.com/v1`).
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
        let model = model.into();

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            vision_model: model.clone(),
            model,
            timeout,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: &InferenceConfig) -> InferenceResult<Self> {
        Ok(Self::new(
            &config.openai_base_url,
            config.openai_api_key.clone(),
            &config.model,
            config.timeout,
        )?
        .with_vision_model(&config.vision_model)
        .with_retry(RetryPolicy::new(config.max_retries)))
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_body<'a>(&'a self, request: &ChatRequest) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }

        let content: Vec<Value> = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({ "type": "text", "text": text }),
                ContentPart::Image(image) => json!({
                    "type": "image_url",
                    "image_url": { "url": image.data_url() }
                }),
            })
            .collect();
        messages.push(json!({ "role": "user", "content": content }));

        let response_format = request.schema.as_ref().map(|schema| {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": true
                }
            })
        });

        CompletionRequest {
            model: if request.has_images() {
                &self.vision_model
            } else {
                &self.model
            },
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format,
        }
    }

    async fn send(&self, body: &CompletionRequest<'_>) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let timeout_secs = self.timeout.as_secs();

        let mut builder = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout_secs))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("malformed completion: {}", e)))?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| BackendError::InvalidResponse("no choices in completion".into()))?;

        if let Some(refusal) = message.refusal {
            return Err(BackendError::InvalidResponse(format!("model refused: {}", refusal)));
        }
        message
            .content
            .ok_or_else(|| BackendError::InvalidResponse("empty completion content".into()))
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let body = self.build_body(request);
        debug!(
            stage = %request.stage,
            model = body.model,
            parts = request.parts.len(),
            structured = request.schema.is_some(),
            "Sending chat completion"
        );
        self.retry
            .run(request.stage.as_str(), || self.send(&body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ImageData, ResponseSchema};
    use vinsight_models::Stage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    fn backend(server: &MockServer) -> OpenAiBackend {
        OpenAiBackend::new(
            server.uri(),
            Some("sk-test".to_string()),
            "text-model",
            Duration::from_secs(5),
        )
        .unwrap()
        .with_vision_model("vision-model")
        .with_retry(RetryPolicy::new(2).with_base_delay(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_complete_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hello")))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest::new(Stage::TranscriptSummary).text("Summarize");
        let text = backend(&server).complete(&request).await.unwrap();

        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_request_body_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
            .mount(&server)
            .await;

        let request = ChatRequest::new(Stage::FrameDescriptions)
            .system("system prompt")
            .text("Frame 0:")
            .image(ImageData::jpeg(b"abc"))
            .schema(ResponseSchema {
                name: "image_descriptions".into(),
                schema: json!({ "type": "object" }),
            })
            .temperature(0.4)
            .max_tokens(1000);
        backend(&server).complete(&request).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();

        assert_eq!(body["model"], "vision-model");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"][0]["text"], "Frame 0:");
        assert_eq!(
            body["messages"][1]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,YWJj"
        );
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(
            body["response_format"]["json_schema"]["name"],
            "image_descriptions"
        );
    }

    #[tokio::test]
    async fn test_text_request_uses_text_model_without_schema() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .mount(&server)
            .await;

        let request = ChatRequest::new(Stage::TranscriptSummary).text("hi");
        backend(&server).complete(&request).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["model"], "text-model");
        assert!(body.get("response_format").is_none());
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("recovered")))
            .mount(&server)
            .await;

        let request = ChatRequest::new(Stage::TopicExtraction).text("topics");
        let text = backend(&server).complete(&request).await.unwrap();

        assert_eq!(text, "recovered");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest::new(Stage::TopicExtraction).text("topics");
        let err = backend(&server).complete(&request).await.unwrap_err();

        assert!(matches!(err, BackendError::Status { status: 401, ref body } if body == "bad key"));
    }

    #[tokio::test]
    async fn test_missing_content_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let request = ChatRequest::new(Stage::HolisticSummary).text("x");
        let err = backend(&server).complete(&request).await.unwrap_err();

        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }
}
