//! Gemini provider implementation using the `generateContent` API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::ApiKey;

use super::{
    check_http_response, GenerateRequest, GenerateResponse, GenerativeProvider, ProviderError,
    UsageStats,
};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model name.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

const JSON_MIME_TYPE: &str = "application/json";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// `generateContent` request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Conversation contents; always a single user entry here.
    pub contents: Vec<GeminiContent>,
    /// Structured-output settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

/// One content entry.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Role: "user" or "model".
    #[serde(default)]
    pub role: Option<String>,
    /// Content parts.
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A content part. Only text parts are produced or read.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    /// Part text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Generation settings for strict JSON replies.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    /// Reply MIME type.
    pub response_mime_type: String,
    /// Declared reply schema.
    pub response_schema: Value,
}

/// `generateContent` response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    /// Reply candidates.
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    /// Token usage.
    #[serde(default)]
    pub usage_metadata: Option<GeminiUsage>,
}

/// One reply candidate.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// Candidate content.
    #[serde(default)]
    pub content: Option<GeminiContent>,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Gemini usage statistics.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsage {
    /// Prompt tokens.
    #[serde(default)]
    pub prompt_token_count: u32,
    /// Generated tokens.
    #[serde(default)]
    pub candidates_token_count: u32,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Gemini `generateContent` provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    model: String,
    endpoint: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a provider for `model` served from `endpoint`.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            model: model.into(),
            endpoint: endpoint.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Full `generateContent` URL for the configured model.
    pub fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build a Gemini request body from a generate request.
#[doc(hidden)]
pub fn build_request(request: &GenerateRequest) -> GeminiRequest {
    let generation_config = request
        .response_schema
        .as_ref()
        .map(|schema| GeminiGenerationConfig {
            response_mime_type: JSON_MIME_TYPE.to_owned(),
            response_schema: schema.to_value(),
        });

    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_owned()),
            parts: vec![GeminiPart {
                text: Some(request.prompt.clone()),
            }],
        }],
        generation_config,
    }
}

/// Parse a Gemini response body, taking the first candidate's first part.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body is not valid JSON and
/// `ProviderError::MissingText` if `candidates[0].content.parts[0].text` is absent.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<GenerateResponse, ProviderError> {
    let resp: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let usage = resp.usage_metadata.map(|u| UsageStats {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
    });

    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(ProviderError::MissingText("no candidates".to_owned()));
    };

    let text = candidate
        .content
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| ProviderError::MissingText("first candidate has no text part".to_owned()))?;

    Ok(GenerateResponse {
        text,
        finish_reason: candidate.finish_reason,
        usage,
    })
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl GenerativeProvider for GeminiProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let api_request = build_request(&request);

        let response = self
            .client
            .post(self.url())
            .header("content-type", "application/json")
            .header("x-goog-api-key", self.api_key.expose())
            .json(&api_request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
