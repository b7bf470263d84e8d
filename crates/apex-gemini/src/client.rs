//! Gemini `generateContent` client.
//!
//! [`GenerativeModel`] is the seam between the retrying executor and the
//! transport; [`GeminiClient`] is the REST implementation.

use apex_core::ImageData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, GeminiConfig};

/// One outbound generation request: instruction text plus an inline image.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub image: ImageData,
    pub temperature: f64,
    /// When set, asks the model for a typed payload (e.g. `application/json`).
    pub response_mime_type: Option<String>,
}

/// What came back from one successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub text: Option<String>,
}

impl GenerateResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }

    /// The text, if present and not blank.
    pub fn into_text(self) -> Option<String> {
        self.text.filter(|t| !t.trim().is_empty())
    }
}

/// Transport and service failures, before classification.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Request to Gemini failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} ({reason}): {message}")]
    Api {
        status: u16,
        /// API status with underscores as spaces, e.g. `permission denied`.
        reason: String,
        message: String,
    },

    #[error("Candidate was blocked due to safety settings (reason: {reason})")]
    Blocked { reason: String },

    #[error("Failed to decode Gemini response: {0}")]
    Decode(String),
}

/// A multimodal text generator.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError>;
}

#[async_trait]
impl<M: GenerativeModel + ?Sized> GenerativeModel for std::sync::Arc<M> {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        (**self).generate(request).await
    }
}

// Wire types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

/// Finish reasons that mean the candidate was withheld.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

fn build_body(request: &GenerateRequest) -> GenerateContentBody {
    GenerateContentBody {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![
                Part::Text {
                    text: request.prompt.clone(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: request.image.mime().as_str().to_string(),
                        data: request.image.to_base64(),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            response_mime_type: request.response_mime_type.clone(),
        },
    }
}

/// Pull the text out of a decoded response, or report why it was withheld.
fn extract_response(response: GenerateContentResponse) -> Result<GenerateResponse, ModelError> {
    let block_reason = response
        .prompt_feedback
        .and_then(|f| f.block_reason);

    let Some(candidate) = response.candidates.into_iter().next() else {
        return match block_reason {
            Some(reason) => Err(ModelError::Blocked { reason }),
            None => Ok(GenerateResponse::empty()),
        };
    };

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        if let Some(reason) = candidate
            .finish_reason
            .filter(|r| BLOCKING_FINISH_REASONS.contains(&r.as_str()))
            .or(block_reason)
        {
            return Err(ModelError::Blocked { reason });
        }
        return Ok(GenerateResponse::empty());
    }

    Ok(GenerateResponse::text(text))
}

/// Turn a non-2xx response into a [`ModelError::Api`].
fn parse_api_error(status: u16, body: &str) -> ModelError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (truncate(body.trim(), 300), None),
    };

    let reason = api_status
        .map(|s| s.to_lowercase().replace('_', " "))
        .or_else(|| {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(|r| r.to_lowercase())
        })
        .unwrap_or_else(|| "error".to_string());

    ModelError::Api {
        status,
        reason,
        message,
    }
}

/// Map an HTTP status and body to a response or error.
fn handle_response(status: u16, body: &str) -> Result<GenerateResponse, ModelError> {
    if !(200..300).contains(&status) {
        return Err(parse_api_error(status, body));
    }
    let decoded: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Decode(e.to_string()))?;
    extract_response(decoded)
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// REST client for the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Build a client. Fails if the key is blank or the HTTP client
    /// cannot be constructed.
    pub fn new(config: GeminiConfig) -> Result<Self, ConfigError> {
        if config.api_key().trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        let body = build_body(request);
        debug!(
            model = %self.config.model,
            image_bytes = request.image.len(),
            mime = %request.image.mime(),
            temperature = request.temperature,
            "Calling Gemini generateContent"
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", self.config.api_key())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let result = handle_response(status.as_u16(), &text)?;
        debug!(
            status = status.as_u16(),
            text_len = result.text.as_ref().map_or(0, |t| t.len()),
            "Gemini responded"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_core::{classify, ErrorCategory, RawFailure};
    use serde_json::json;

    fn request() -> GenerateRequest {
        GenerateRequest {
            prompt: "describe".to_string(),
            image: ImageData::new(vec![1, 2, 3], "image/png").unwrap(),
            temperature: 0.5,
            response_mime_type: Some("application/json".to_string()),
        }
    }

    fn decode(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_body_shape() {
        let body = serde_json::to_value(build_body(&request())).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "describe" },
                        { "inlineData": { "mimeType": "image/png", "data": "AQID" } }
                    ]
                }],
                "generationConfig": {
                    "temperature": 0.5,
                    "responseMimeType": "application/json"
                }
            })
        );
    }

    #[test]
    fn test_body_omits_response_mime_when_unset() {
        let mut req = request();
        req.response_mime_type = None;
        let body = serde_json::to_value(build_body(&req)).unwrap();
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_extract_joins_text_parts() {
        let response = decode(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"sugg" }, { "text": "estions\":[]}" }] },
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(
            extract_response(response).unwrap(),
            GenerateResponse::text("{\"suggestions\":[]}")
        );
    }

    #[test]
    fn test_extract_no_candidates_is_empty() {
        let response = decode(json!({}));
        assert_eq!(extract_response(response).unwrap(), GenerateResponse::empty());
    }

    #[test]
    fn test_extract_prompt_blocked() {
        let response = decode(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        let err = extract_response(response).unwrap_err();
        assert!(matches!(err, ModelError::Blocked { ref reason } if reason == "SAFETY"));
        assert_eq!(classify(RawFailure::from_error(&err)).category(), ErrorCategory::ContentModerated);
    }

    #[test]
    fn test_extract_candidate_blocked() {
        let response = decode(json!({
            "candidates": [{ "finishReason": "PROHIBITED_CONTENT" }]
        }));
        assert!(matches!(extract_response(response), Err(ModelError::Blocked { .. })));
    }

    #[test]
    fn test_extract_other_finish_reason_is_empty() {
        let response = decode(json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] }));
        assert_eq!(extract_response(response).unwrap(), GenerateResponse::empty());
    }

    #[test]
    fn test_parse_api_error_envelope() {
        let body = r#"{"error":{"code":503,"message":"The model is overloaded. Please try again later.","status":"UNAVAILABLE"}}"#;
        let err = parse_api_error(503, body);
        assert_eq!(
            err.to_string(),
            "HTTP 503 (unavailable): The model is overloaded. Please try again later."
        );
        assert_eq!(classify(RawFailure::from_error(&err)).category(), ErrorCategory::ServiceUnavailable);
    }

    #[test]
    fn test_parse_api_error_auth() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        let err = parse_api_error(400, body);
        assert_eq!(classify(RawFailure::from_error(&err)).category(), ErrorCategory::AuthInvalid);

        let body = r#"{"error":{"code":403,"message":"Caller has no access.","status":"PERMISSION_DENIED"}}"#;
        let err = parse_api_error(403, body);
        assert_eq!(classify(RawFailure::from_error(&err)).category(), ErrorCategory::AuthInvalid);
    }

    #[test]
    fn test_parse_api_error_plain_body() {
        let err = parse_api_error(502, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), "HTTP 502 (bad gateway): <html>bad gateway</html>");
    }

    #[test]
    fn test_handle_response_routes_status() {
        let body = r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#;
        let err = handle_response(503, body).unwrap_err();
        assert_eq!(err.to_string(), "HTTP 503 (unavailable): The model is overloaded.");

        let ok = r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]}}]}"#;
        assert_eq!(handle_response(200, ok).unwrap(), GenerateResponse::text("hi"));
    }

    #[test]
    fn test_handle_response_undecodable_success_body() {
        let err = handle_response(200, "<html>not json</html>").unwrap_err();
        assert!(matches!(err, ModelError::Decode(_)));
        assert_eq!(
            classify(RawFailure::from_error(&err)).category(),
            ErrorCategory::Unexpected
        );
    }

    #[test]
    fn test_blank_text_is_not_usable() {
        assert_eq!(GenerateResponse::text("  \n").into_text(), None);
        assert_eq!(GenerateResponse::text("ok").into_text(), Some("ok".to_string()));
    }

    #[test]
    fn test_client_debug_redacts_key() {
        let config = GeminiConfig::new("super-secret").unwrap();
        let client = GeminiClient::new(config).unwrap();
        assert!(!format!("{:?}", client).contains("super-secret"));
    }
}
