//! Gemini provider implementation.
//!
//! Calls the `generateContent` REST method with the prompt as the single user
//! turn and turns the JSON reply into a [`ModelOutput`].

use super::{ChatModel, ModelOutput, ProviderError};
use crate::config::GeminiSettings;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Finish reasons under which Gemini withholds the candidate text.
const FILTERED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
];

/// Header carrying the API key, so the key never appears in URLs or logs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini chat provider.
pub struct GeminiChatModel {
    settings: GeminiSettings,
    client: Client,
}

impl GeminiChatModel {
    pub fn new(settings: GeminiSettings) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            ProviderError::InvalidRequest(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { settings, client })
    }

    /// Build the `generateContent` URL for `model`.
    ///
    /// Accepts both `gemini-2.5-flash` and `models/gemini-2.5-flash`. Names
    /// that would escape the model path segment are refused.
    fn endpoint_for(&self, model: &str) -> Result<String, ProviderError> {
        let model = model.trim();
        let model = model.strip_prefix("models/").unwrap_or(model);

        if model.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "model name must not be empty".to_string(),
            ));
        }
        if model
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace())
        {
            return Err(ProviderError::InvalidRequest(format!(
                "model name '{}' cannot be used in a request path",
                model
            )));
        }

        Ok(format!(
            "{}/models/{}:generateContent",
            self.settings.api_base.trim_end_matches('/'),
            model
        ))
    }
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    async fn invoke(&self, model: &str, prompt: &str) -> Result<ModelOutput, ProviderError> {
        let url = self.endpoint_for(model)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                    thought: None,
                }],
            }],
        };

        tracing::debug!(model = %model, prompt_len = prompt.len(), "Sending request to Gemini API");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.settings.api_key())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(model = %model, status = %status, "Gemini API returned an error");

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(ProviderError::RateLimited(body));
            }
            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        parse_response(value)
    }
}

/// Classify a successful `generateContent` reply.
///
/// A first candidate with text parts becomes a message holding that text. A
/// blocked prompt, a safety stop, or a candidate withheld by a filter is an
/// error; any other reply without text falls back to its raw shape.
fn parse_response(value: Value) -> Result<ModelOutput, ProviderError> {
    let Ok(response) = serde_json::from_value::<GenerateContentResponse>(value.clone()) else {
        return Ok(ModelOutput::from_value(value));
    };

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(ProviderError::ContentFiltered(format!(
            "prompt blocked: {}",
            reason
        )));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(ModelOutput::from_value(value));
    };

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(ProviderError::ContentFiltered(
            "response stopped for safety reasons".to_string(),
        ));
    }

    if let Some(usage) = &response.usage_metadata {
        tracing::debug!(
            input_tokens = usage.prompt_token_count.unwrap_or(0),
            output_tokens = usage.candidates_token_count.unwrap_or(0),
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("UNKNOWN"),
            "Gemini API response received"
        );
    }

    let finish_reason = candidate.finish_reason.clone();
    let texts: Vec<String> = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought.unwrap_or(false))
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if texts.is_empty() {
        if let Some(reason) = finish_reason
            .as_deref()
            .filter(|reason| FILTERED_FINISH_REASONS.contains(reason))
        {
            return Err(ProviderError::ContentFiltered(format!(
                "response withheld: {}",
                reason
            )));
        }
        return Ok(ModelOutput::from_value(value));
    }

    Ok(ModelOutput::Message {
        content: texts.concat(),
    })
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_GEMINI_API_BASE;
    use secrecy::Secret;
    use serde_json::json;

    fn provider() -> GeminiChatModel {
        GeminiChatModel::new(GeminiSettings {
            api_key: Secret::new("test-key".to_string()),
            api_base: format!("{}/", DEFAULT_GEMINI_API_BASE),
            default_model: "gemini-2.5-flash".to_string(),
            request_timeout: None,
        })
        .unwrap()
    }

    #[test]
    fn endpoint_includes_model_and_method() {
        assert_eq!(
            provider().endpoint_for("gemini-2.5-flash").unwrap(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn endpoint_accepts_models_prefix() {
        assert_eq!(
            provider().endpoint_for("models/gemini-2.0-flash").unwrap(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn endpoint_rejects_unusable_names() {
        for model in ["", "   ", "a/b", "x?key=1", "with space"] {
            assert!(
                matches!(
                    provider().endpoint_for(model),
                    Err(ProviderError::InvalidRequest(_))
                ),
                "{model:?} should be rejected"
            );
        }
    }

    #[test]
    fn candidate_text_parts_are_joined() {
        let output = parse_response(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "Hello "},
                    {"text": "bhai!"}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 3}
        }))
        .unwrap();

        assert_eq!(
            output,
            ModelOutput::Message {
                content: "Hello bhai!".to_string()
            }
        );
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let err = parse_response(json!({"promptFeedback": {"blockReason": "SAFETY"}}))
            .unwrap_err();
        assert!(matches!(err, ProviderError::ContentFiltered(_)));
    }

    #[test]
    fn safety_stop_is_an_error() {
        let err = parse_response(json!({"candidates": [{"finishReason": "SAFETY"}]}))
            .unwrap_err();
        assert!(matches!(err, ProviderError::ContentFiltered(_)));
    }

    #[test]
    fn filtered_candidate_without_text_is_an_error() {
        for reason in ["PROHIBITED_CONTENT", "RECITATION"] {
            let err = parse_response(json!({"candidates": [{"finishReason": reason}]}))
                .unwrap_err();
            assert!(
                matches!(err, ProviderError::ContentFiltered(ref msg) if msg.contains(reason)),
                "{reason} should be filtered, got {err:?}"
            );
        }
    }

    #[test]
    fn candidate_without_text_falls_back_to_raw_reply() {
        let reply = json!({
            "candidates": [{
                "content": {"role": "model", "parts": []},
                "finishReason": "MAX_TOKENS"
            }]
        });

        let output = parse_response(reply.clone()).unwrap();

        assert!(matches!(output, ModelOutput::Mapping(_)));
        let answer = output.into_answer();
        assert!(!answer.is_empty());
        assert_eq!(serde_json::from_str::<Value>(&answer).unwrap(), reply);
    }

    #[test]
    fn thought_only_candidate_is_not_an_empty_message() {
        let output = parse_response(json!({
            "candidates": [{
                "content": {"parts": [{"text": "hmm", "thought": true}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_ne!(
            output,
            ModelOutput::Message {
                content: String::new()
            }
        );
    }

    #[test]
    fn reply_without_candidates_falls_back_to_shape() {
        let output = parse_response(json!({"content": "direct"})).unwrap();
        assert_eq!(output.into_answer(), "direct");

        let output = parse_response(json!("plain")).unwrap();
        assert_eq!(output, ModelOutput::Text("plain".to_string()));
    }
}
