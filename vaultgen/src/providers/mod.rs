pub mod compatible;
pub mod google;
pub mod huggingface;
pub mod mock;
pub mod sanitize;

use crate::types::{GenerationOptions, ProviderId};
use async_trait::async_trait;

/// Errors from a single adapter attempt.
///
/// Every variant is recoverable at the fallback-loop level: the loop records
/// it and advances to the next (credential, model) pair. Transport and
/// response failures differ only in how they are reported.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response contained no generated text")]
    EmptyResponse,

    #[error("Response too short ({len} chars, minimum {min})")]
    TooShort { len: usize, min: usize },
}

impl ProviderError {
    /// True for failures reaching the provider (network, timeout); false for
    /// failures of the provider's reply (status, shape, threshold).
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. } | ProviderError::Network(_))
    }

    /// Map a reqwest error, folding timeouts into their own variant so logs
    /// can tell "provider slow" apart from "provider unreachable".
    pub fn from_reqwest(err: reqwest::Error, timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout {
                after_ms: timeout.as_millis() as u64,
            }
        } else {
            ProviderError::Network(err)
        }
    }
}

/// One external generation API.
///
/// An adapter performs exactly one network call per `generate` invocation,
/// maps the provider's response envelope to plain text, and classifies every
/// failure as a [`ProviderError`] instead of leaking provider shapes upward.
#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Candidate model identifiers, tried in order for each credential.
    /// Single-model providers return one entry.
    fn models(&self) -> &[String];

    /// Attempt generation with one credential against one model.
    async fn generate(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError>;
}

/// Apply the acceptance threshold: a reply at or below `min_chars` is a
/// degenerate response, not a success.
pub(crate) fn check_threshold(text: String, min_chars: usize) -> Result<String, ProviderError> {
    let len = text.chars().count();
    if len == 0 {
        return Err(ProviderError::EmptyResponse);
    }
    if len <= min_chars {
        return Err(ProviderError::TooShort { len, min: min_chars });
    }
    Ok(text)
}
