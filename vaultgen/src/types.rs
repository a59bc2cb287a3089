//! Core request/result types for the generation fallback client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier for an external text-generation API.
///
/// Closed set: adding a provider means adding an adapter, so this is an enum
/// rather than an open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Perplexity,
    Gemini,
    HuggingFace,
    Groq,
}

impl ProviderId {
    /// Environment variable holding this provider's credential configuration.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::Perplexity => "PERPLEXITY_API_KEY",
            ProviderId::Gemini => "GEMINI_API_KEY",
            ProviderId::HuggingFace => "HUGGINGFACE_API_KEY",
            ProviderId::Groq => "GROQ_API_KEY",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderId::Perplexity => "perplexity",
            ProviderId::Gemini => "gemini",
            ProviderId::HuggingFace => "huggingface",
            ProviderId::Groq => "groq",
        };
        f.write_str(name)
    }
}

/// Deployment-policy default: most capable provider first, free/rate-limited
/// alternatives only on exhaustion.
pub const DEFAULT_PRIORITY: [ProviderId; 3] = [
    ProviderId::Perplexity,
    ProviderId::Gemini,
    ProviderId::HuggingFace,
];

/// Replies at or below this many characters are treated as degenerate and
/// rejected so the fallback loop can try the next credential.
pub const DEFAULT_MIN_CHARS: usize = 100;

/// Per-attempt network timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// A user-supplied credential that bypasses the shared fallback chain.
#[derive(Clone)]
pub struct OverrideCredential {
    pub provider: ProviderId,
    pub credential: String,
}

// Manual impl so debug-formatting a request can never print the raw secret.
impl fmt::Debug for OverrideCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideCredential")
            .field("provider", &self.provider)
            .field("credential", &crate::credentials::mask_credential(&self.credential))
            .finish()
    }
}

/// One call to [`crate::GenerationClient::generate`].
///
/// The prompt arrives fully rendered; this crate never assembles prompt text
/// from resume or job-description fields.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Providers to attempt, in order. Order is configuration, never computed.
    pub priority: Vec<ProviderId>,
    /// When set, only this (provider, credential) pair is attempted and the
    /// priority list is ignored entirely, even on failure.
    pub override_credential: Option<OverrideCredential>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            priority: DEFAULT_PRIORITY.to_vec(),
            override_credential: None,
        }
    }

    pub fn with_priority(mut self, priority: Vec<ProviderId>) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_override(mut self, provider: ProviderId, credential: impl Into<String>) -> Self {
        self.override_credential = Some(OverrideCredential {
            provider,
            credential: credential.into(),
        });
        self
    }
}

/// Tuning knobs shared by every adapter attempt.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Hard bound on each individual provider call.
    pub timeout: Duration,
    /// Optional deadline across the whole fallback chain. Each attempt's
    /// timeout is clamped to the remaining budget; once spent, the loop stops.
    pub overall_timeout: Option<Duration>,
    /// Acceptance threshold from [`DEFAULT_MIN_CHARS`].
    pub min_chars: usize,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
            overall_timeout: None,
            min_chars: DEFAULT_MIN_CHARS,
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

/// A successful generation plus provenance for the caller.
///
/// Only built from a response that completed without transport or HTTP error
/// and carried text above the acceptance threshold. The credential field is
/// masked; the raw secret never appears here.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub text: String,
    pub provider: ProviderId,
    /// Position of the winning credential in its provider's rotation.
    pub credential_index: usize,
    /// Masked form, e.g. `pplx-abc...9f2e`.
    pub credential: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Record of one failed (provider, credential, model) attempt.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub provider: ProviderId,
    pub credential_index: usize,
    /// Masked form only.
    pub credential: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub error: String,
    /// True for network/timeout failures, false for response failures. Both
    /// advance the loop identically; this is for diagnosis only.
    pub transport: bool,
}

/// Every configured combination was tried and none produced usable text.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationFailure {
    pub attempts: Vec<Attempt>,
    pub last_error: String,
    /// Whether the exhausted path was a caller-supplied override credential.
    /// Lets the surrounding layer distinguish "supply your own key to retry"
    /// from "the service is fully unavailable".
    pub override_used: bool,
}

impl GenerationFailure {
    /// Number of attempts made against the given provider.
    pub fn attempts_for(&self, provider: ProviderId) -> usize {
        self.attempts.iter().filter(|a| a.provider == provider).count()
    }
}
