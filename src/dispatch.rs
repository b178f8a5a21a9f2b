//! Outbound request dispatch with timeout and failure classification.
//!
//! The [`Dispatcher`] wraps a shared [`GenerativeProvider`] and turns every
//! provider outcome into either a [`ModelReply`] or one [`DispatchError`]
//! variant that features map to user-visible fallback text.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::providers::{GenerateRequest, GenerativeProvider, ProviderError, UsageStats};
use crate::structured::{SchemaViolation, StructuredReply};

/// Default wait for a single provider call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A successful reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    /// Reply text.
    pub text: String,
    /// Why the model stopped, if reported.
    pub finish_reason: Option<String>,
    /// Token usage, if reported.
    pub usage: Option<UsageStats>,
}

/// Why a dispatch produced no usable reply.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Network failure or non-success HTTP status.
    #[error("transport failure{}: {detail}", status_suffix(.status))]
    Transport {
        /// HTTP status, when the server answered.
        status: Option<u16>,
        /// Sanitized description.
        detail: String,
    },
    /// Success status but no reply text at the expected path.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// Reply text did not match the feature's declared schema.
    #[error(transparent)]
    SchemaViolation(#[from] SchemaViolation),
    /// The provider did not answer within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Credentials or endpoint are not configured.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl DispatchError {
    /// Stable variant name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::MalformedResponse(_) => "malformed_response",
            Self::SchemaViolation(_) => "schema_violation",
            Self::Timeout(_) => "timeout",
            Self::ConfigurationMissing(_) => "configuration_missing",
        }
    }
}

impl From<ProviderError> for DispatchError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Request(e) => Self::Transport {
                status: e.status().map(|s| s.as_u16()),
                detail: e.to_string(),
            },
            ProviderError::HttpStatus { status, body } => Self::Transport {
                status: Some(status),
                detail: body,
            },
            ProviderError::Parse(detail) | ProviderError::MissingText(detail) => {
                Self::MalformedResponse(detail)
            }
            ProviderError::Unavailable(detail) => Self::ConfigurationMissing(detail),
        }
    }
}

/// Sends prompts to the shared provider, one call per dispatch.
#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn GenerativeProvider>,
    timeout: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("model", &self.provider.model_id())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher with the default timeout.
    pub fn new(provider: Arc<dyn GenerativeProvider>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Model identifier of the underlying provider.
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    /// Send one request and wait for its reply.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on transport failure, a malformed reply,
    /// timeout, or missing configuration.
    pub async fn dispatch(&self, request: GenerateRequest) -> Result<ModelReply, DispatchError> {
        let started = Instant::now();
        let prompt_chars = request.prompt.chars().count();
        let structured = request.response_schema.is_some();

        let outcome = tokio::time::timeout(self.timeout, self.provider.generate(request)).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            Ok(Ok(response)) => Ok(ModelReply {
                text: response.text,
                finish_reason: response.finish_reason,
                usage: response.usage,
            }),
            Ok(Err(err)) => Err(DispatchError::from(err)),
            Err(_) => Err(DispatchError::Timeout(self.timeout)),
        };

        match &result {
            Ok(reply) => debug!(
                model = self.provider.model_id(),
                prompt_chars,
                reply_chars = reply.text.chars().count(),
                input_tokens = reply.usage.map(|u| u.input_tokens),
                output_tokens = reply.usage.map(|u| u.output_tokens),
                finish_reason = reply.finish_reason.as_deref(),
                structured,
                elapsed_ms,
                "dispatch succeeded"
            ),
            Err(err) => warn!(
                model = self.provider.model_id(),
                kind = err.kind(),
                error = %err,
                elapsed_ms,
                "dispatch failed"
            ),
        }

        result
    }

    /// Send a request declaring `T`'s schema and parse the reply into `T`.
    ///
    /// # Errors
    ///
    /// Returns every error [`Dispatcher::dispatch`] can, plus
    /// [`DispatchError::SchemaViolation`] when the reply does not validate.
    pub async fn dispatch_structured<T: StructuredReply>(
        &self,
        prompt: impl Into<String>,
    ) -> Result<T, DispatchError> {
        let request = GenerateRequest::text(prompt).with_schema(T::schema());
        let reply = self.dispatch(request).await?;
        T::parse(&reply.text).map_err(|violation| {
            warn!(reason = %violation.reason, "structured reply rejected");
            DispatchError::SchemaViolation(violation)
        })
    }
}
