//! Chat backend abstraction.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value;

use vinsight_models::Stage;

use crate::error::BackendError;

/// JPEG image ready to send to a vision model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    /// Base64-encoded bytes (standard alphabet, padded)
    pub base64: String,
}

impl ImageData {
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            base64: BASE64.encode(bytes),
        }
    }

    /// `data:` URL form used by OpenAI-compatible APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// One piece of the user message.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Image(ImageData),
}

/// JSON schema the response must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

impl ResponseSchema {
    /// Build a schema from a response type.
    ///
    /// Subschemas are inlined and keywords that strict structured-output
    /// modes reject (`$schema`, `title`, `format`, numeric bounds) are removed.
    pub fn for_type<T: JsonSchema>(name: impl Into<String>) -> Self {
        let generator = SchemaSettings::draft07()
            .with(|s| {
                s.inline_subschemas = true;
                s.meta_schema = None;
            })
            .into_generator();
        let root = generator.into_root_schema_for::<T>();
        let mut schema = serde_json::to_value(root).unwrap_or(Value::Null);
        strip_unsupported_keywords(&mut schema);
        Self {
            name: name.into(),
            schema,
        }
    }
}

fn strip_unsupported_keywords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in ["$schema", "title", "format", "minimum", "maximum", "definitions"] {
                map.remove(key);
            }
            for (key, child) in map.iter_mut() {
                match (key.as_str(), child) {
                    // Property names are data, not keywords
                    ("properties", Value::Object(props)) => {
                        props.values_mut().for_each(strip_unsupported_keywords)
                    }
                    (_, child) => strip_unsupported_keywords(child),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_unsupported_keywords),
        _ => {}
    }
}

/// A single chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Stage the request belongs to, for logging
    pub stage: Stage,
    pub system: Option<String>,
    pub parts: Vec<ContentPart>,
    /// Structured output schema, `None` for free text
    pub schema: Option<ResponseSchema>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            system: None,
            parts: Vec::new(),
            schema: None,
            temperature: 0.2,
            max_tokens: 300,
        }
    }

    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.system = Some(prompt.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(ContentPart::Text(text.into()));
        self
    }

    pub fn image(mut self, image: ImageData) -> Self {
        self.parts.push(ContentPart::Image(image));
        self
    }

    pub fn schema(mut self, schema: ResponseSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Whether any part is an image.
    pub fn has_images(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, ContentPart::Image(_)))
    }

    /// All text parts joined by blank lines.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A language/vision model that answers chat requests.
///
/// Implementations own their transport, timeout and retry policy. A single
/// instance is built at startup and shared by every analysis.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Send a request and return the assistant's message text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError>;
}
