//! Language-model provider abstraction and implementations.
//!
//! Handlers only see [`ChatModel`], so the Gemini backend can be swapped for
//! the mock in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use serde_json::{Map, Value};
use service_core::error::AppError;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::LlmRequestFailed(err.to_string())
    }
}

/// Everything a provider may hand back, from most to least structured.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// A chat message with text content.
    Message { content: String },
    /// A JSON object that may carry a `content` entry.
    Mapping(Map<String, Value>),
    /// Bare text.
    Text(String),
    /// Anything else.
    Other(Value),
}

impl ModelOutput {
    /// Classify a raw JSON value that did not parse as a chat message.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => ModelOutput::Mapping(map),
            Value::String(text) => ModelOutput::Text(text),
            other => ModelOutput::Other(other),
        }
    }

    /// Reduce the output to answer text.
    ///
    /// Message content is preferred, then a mapping's `content` entry, then
    /// bare text; anything else is rendered as JSON.
    pub fn into_answer(self) -> String {
        match self {
            ModelOutput::Message { content } => content,
            ModelOutput::Mapping(mut map) => match map.remove("content") {
                Some(Value::String(content)) => content,
                Some(content) => content.to_string(),
                None => Value::Object(map).to_string(),
            },
            ModelOutput::Text(text) => text,
            ModelOutput::Other(value) => value.to_string(),
        }
    }
}

/// A client for a hosted generative language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `prompt` as the only user turn to `model` and return its output.
    async fn invoke(&self, model: &str, prompt: &str) -> Result<ModelOutput, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_error_becomes_llm_request_failure() {
        let err = AppError::from(ProviderError::NetworkError("connection reset".to_string()));

        assert!(matches!(err, AppError::LlmRequestFailed(_)));
        assert_eq!(
            err.to_string(),
            "LLM request failed: Network error: connection reset"
        );
    }

    #[test]
    fn message_content_is_used_directly() {
        let output = ModelOutput::Message {
            content: "Hello bhai".to_string(),
        };
        assert_eq!(output.into_answer(), "Hello bhai");
    }

    #[test]
    fn mapping_content_string_is_used() {
        let output = ModelOutput::from_value(json!({"content": "from map", "role": "model"}));
        assert_eq!(output.into_answer(), "from map");
    }

    #[test]
    fn mapping_content_non_string_is_rendered() {
        let output = ModelOutput::from_value(json!({"content": ["a", "b"]}));
        assert_eq!(output.into_answer(), r#"["a","b"]"#);
    }

    #[test]
    fn mapping_without_content_falls_back_to_rendering() {
        let output = ModelOutput::from_value(json!({"answer": 42}));
        assert!(matches!(output, ModelOutput::Mapping(_)));
        assert_eq!(output.into_answer(), r#"{"answer":42}"#);
    }

    #[test]
    fn plain_text_is_used_as_is() {
        let output = ModelOutput::from_value(json!("just text"));
        assert_eq!(output, ModelOutput::Text("just text".to_string()));
        assert_eq!(output.into_answer(), "just text");
    }

    #[test]
    fn other_values_are_rendered() {
        assert_eq!(ModelOutput::from_value(json!(7)).into_answer(), "7");
        assert_eq!(ModelOutput::from_value(json!(null)).into_answer(), "null");
        assert_eq!(
            ModelOutput::from_value(json!([1, 2])).into_answer(),
            "[1,2]"
        );
    }
}
