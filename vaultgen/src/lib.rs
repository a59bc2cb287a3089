//! Multi-provider text generation with ordered fallback and key rotation.
//!
//! Given a fully rendered prompt and a prioritized list of providers, the
//! client tries each provider's credentials (and, for multi-model providers,
//! models) strictly in order and returns the first usable response together
//! with provenance: which provider, which credential (masked), which model.
//! Only total exhaustion is reported as a hard failure.

pub mod client;
pub mod credentials;
pub mod providers;
pub mod types;

// Re-exports for convenience
pub use client::{GenerateError, GenerationClient, GenerationClientBuilder};
pub use credentials::{CredentialSet, CredentialStore, mask_credential, parse_credential_list};
pub use providers::{Provider, ProviderError};
pub use types::*;
