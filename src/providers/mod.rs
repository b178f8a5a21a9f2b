//! Generative-text provider abstraction layer.
//!
//! Defines the [`GenerativeProvider`] trait and the shared request/response
//! types used by provider implementations.
//!
//! Two providers are implemented:
//! - [`gemini::GeminiProvider`] : Gemini `generateContent` API
//! - [`UnconfiguredProvider`] : stands in when the model cannot be configured and
//!   fails every call with [`ProviderError::Unavailable`]

use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

pub mod gemini;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Declared shape of a strict JSON-object reply.
///
/// Every property is a string. Serialized into the provider's
/// `responseSchema` field and reused to validate replies after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSchema {
    /// Property names, in declaration order.
    pub properties: Vec<String>,
    /// Property names that must be present.
    pub required: Vec<String>,
}

impl ResponseSchema {
    /// Schema where every listed key is a required string property.
    pub fn required_strings(keys: &[&str]) -> Self {
        let keys: Vec<String> = keys.iter().map(|k| (*k).to_owned()).collect();
        Self {
            properties: keys.clone(),
            required: keys,
        }
    }

    /// Render in the `{type: OBJECT, properties, required}` wire shape.
    pub fn to_value(&self) -> Value {
        let properties: BTreeMap<&str, Value> = self
            .properties
            .iter()
            .map(|name| (name.as_str(), json!({"type": "STRING"})))
            .collect();
        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": self.required,
        })
    }
}

/// A single prompt sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Fully interpolated prompt text.
    pub prompt: String,
    /// When set, the provider is asked for a JSON object of this shape.
    pub response_schema: Option<ResponseSchema>,
}

impl GenerateRequest {
    /// Plain-text request with no response schema.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: None,
        }
    }

    /// Attach a response schema.
    pub fn with_schema(mut self, schema: ResponseSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Usage statistics for a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UsageStats {
    /// Tokens used by the prompt.
    pub input_tokens: u32,
    /// Tokens generated in the reply.
    pub output_tokens: u32,
}

/// The provider's reply to one [`GenerateRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateResponse {
    /// Text of the first part of the first candidate.
    pub text: String,
    /// Why the model stopped, if reported.
    pub finish_reason: Option<String>,
    /// Token usage, if reported.
    pub usage: Option<UsageStats>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by generative-text providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response body was not valid JSON for the expected envelope.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Response parsed but the reply text path was absent.
    #[error("provider response missing reply text: {0}")]
    MissingText(String),
    /// Upstream provider responded with an error status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Provider cannot satisfy the request with current configuration.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await.map_err(reqwest::Error::without_url)?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

fn secret_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"AIza[0-9A-Za-z_\-]{20,}",
            r"ya29\.[0-9A-Za-z_\-]{20,}",
            r"sk-[A-Za-z0-9]{32,}",
            r"ghp_[A-Za-z0-9]{20,}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Collapse whitespace, redact credential-like tokens, and cap the length.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for regex in secret_patterns() {
        sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core generative-text provider interface.
///
/// Implementations must be `Send + Sync` so one provider can be shared by
/// every feature behind an `Arc`.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Send one prompt and wait for one reply. No streaming.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API, network, or parse failure.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError>;

    /// The model identifier this provider is instantiated for.
    fn model_id(&self) -> &str;
}

/// Provider used when the model credential or endpoint is missing.
#[derive(Debug, Clone)]
pub struct UnconfiguredProvider {
    reason: String,
}

impl UnconfiguredProvider {
    /// Create a provider that reports `reason` on every call.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl GenerativeProvider for UnconfiguredProvider {
    async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }

    fn model_id(&self) -> &str {
        "unconfigured"
    }
}
