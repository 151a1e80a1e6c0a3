//! Model-call error types.
//!
//! Every failure at the model boundary surfaces as an [`LlmError`].  The
//! workflow crate wraps it rather than inspecting provider details.

/// Unified error type for LLM requests.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    /// An HTTP request to the provider failed or returned a non-success status.
    #[error("llm request failed: {reason}")]
    RequestFailed { reason: String },

    /// The provider envelope could not be read.
    #[error("llm response parse error: {reason}")]
    ParseFailed { reason: String },

    /// The provider answered but produced no text (blocked prompt, token
    /// exhaustion, safety stop).
    #[error("llm returned no text (finish reason: {finish_reason})")]
    EmptyResponse { finish_reason: String },

    /// A response body was not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the LLM crate.
pub type Result<T> = std::result::Result<T, LlmError>;

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed {
            reason: err.to_string(),
        }
    }
}
