//! Credential parsing, masking, and the per-provider credential store.
//!
//! Provider credential configuration is duck-typed: a value may be a single
//! key or a JSON-encoded array of keys to rotate through. Parsing is total —
//! it never fails for any input string.

use crate::types::ProviderId;
use serde_json::Value;
use std::collections::HashMap;

/// Parse a raw configuration value into an ordered credential list.
///
/// Absent or blank input yields an empty list. A valid JSON array yields its
/// elements verbatim (non-string elements are stringified). Anything else —
/// including JSON that parses to a non-array — is treated as a single
/// credential. Surrounding whitespace is trimmed from each entry.
pub fn parse_credential_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) {
        return items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .collect();
    }

    vec![raw.trim().to_string()]
}

/// Mask a credential for logs and results: first 8 and last 4 characters with
/// an ellipsis between. Credentials too short for prefix+suffix to be safe
/// render as `***`.
pub fn mask_credential(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let prefix: String = chars[..8].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// Ordered credentials for one provider.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    pub credentials: Vec<String>,
}

impl CredentialSet {
    pub fn new(credentials: Vec<String>) -> Self {
        Self { credentials }
    }

    /// Build from a raw environment/config value per the JSON-or-scalar rule.
    pub fn from_env_value(raw: Option<&str>) -> Self {
        Self {
            credentials: parse_credential_list(raw),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

/// In-memory credential registry, read-only for the lifetime of a
/// `generate()` call.
///
/// User-supplied keys are promoted into the rotation via
/// [`upsert`](CredentialStore::upsert) rather than by mutating the process
/// environment.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    sets: HashMap<ProviderId, CredentialSet>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every known provider's credentials from its environment variable.
    pub fn from_env() -> Self {
        let mut store = Self::new();
        for provider in [
            ProviderId::Perplexity,
            ProviderId::Gemini,
            ProviderId::HuggingFace,
            ProviderId::Groq,
        ] {
            let raw = std::env::var(provider.env_var()).ok();
            let set = CredentialSet::from_env_value(raw.as_deref());
            if !set.is_empty() {
                store.set(provider, set);
            }
        }
        store
    }

    /// Replace the credential set for a provider.
    pub fn set(&mut self, provider: ProviderId, set: CredentialSet) {
        self.sets.insert(provider, set);
    }

    /// Promote a credential to the front of a provider's rotation, inserting
    /// the set if absent. Duplicates of the same credential are removed first.
    pub fn upsert(&mut self, provider: ProviderId, credential: impl Into<String>) {
        let credential = credential.into();
        let set = self.sets.entry(provider).or_default();
        set.credentials.retain(|c| c != &credential);
        set.credentials.insert(0, credential);
    }

    pub fn get(&self, provider: ProviderId) -> Option<&CredentialSet> {
        self.sets.get(&provider)
    }

    /// Credentials for a provider, empty when none are configured.
    pub fn credentials(&self, provider: ProviderId) -> &[String] {
        self.sets
            .get(&provider)
            .map(|s| s.credentials.as_slice())
            .unwrap_or(&[])
    }
}
