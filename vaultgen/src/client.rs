//! The fallback/rotation algorithm over registered provider adapters.
//!
//! Attempts are strictly sequential and strictly ordered: providers in the
//! request's priority order, credentials in list order within a provider,
//! models in listed order within a credential. The first success wins and
//! nothing further is tried. Failed triples are never retried. Callers may
//! depend on "cheapest acceptable provider wins", so the order must never be
//! changed for throughput.

use crate::credentials::{CredentialStore, mask_credential};
use crate::providers::{Provider, ProviderError};
use crate::providers::compatible::OpenAiCompatibleProvider;
use crate::providers::google::GoogleProvider;
use crate::providers::huggingface::HuggingFaceProvider;
use crate::types::{
    Attempt, GenerationFailure, GenerationOptions, GenerationRequest, GenerationResult, ProviderId,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Terminal outcomes of [`GenerationClient::generate`].
///
/// Individual attempt failures never surface here; they are folded into the
/// attempt log because a single provider failing is routine, not exceptional.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// No provider in the priority list has a credential and no override was
    /// supplied. Raised before any network call.
    #[error("generation is not configured: no credentials available for any provider")]
    NotConfigured,

    /// Every (provider, credential, model) combination failed.
    #[error("all providers exhausted after {} attempts: {}", .0.attempts.len(), .0.last_error)]
    Exhausted(GenerationFailure),
}

/// Multi-provider generation client with ordered fallback and key rotation.
///
/// Holds no mutable state between calls; concurrent `generate()` calls share
/// nothing and may run fully in parallel. Cancelling (dropping) a `generate()`
/// future aborts the in-flight provider call and prevents further attempts.
pub struct GenerationClient {
    providers: HashMap<ProviderId, Arc<dyn Provider>>,
    store: CredentialStore,
    options: GenerationOptions,
}

impl GenerationClient {
    pub fn builder() -> GenerationClientBuilder {
        GenerationClientBuilder::new()
    }

    /// Client with all real adapters and credentials from the environment.
    pub fn from_env() -> Self {
        Self::builder()
            .with_provider(OpenAiCompatibleProvider::perplexity())
            .with_provider(GoogleProvider::new())
            .with_provider(HuggingFaceProvider::new())
            .with_provider(OpenAiCompatibleProvider::groq())
            .with_credentials(CredentialStore::from_env())
            .build()
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Run the fallback chain for one request.
    ///
    /// Returns the first usable response, or [`GenerateError::Exhausted`] with
    /// the full attempt log once every configured combination has failed.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerateError> {
        let deadline = self.options.overall_timeout.map(|d| Instant::now() + d);

        // Override path: one (provider, credential) pair, no fall-through.
        if let Some(ov) = &request.override_credential {
            return self
                .generate_with_override(request, ov.provider, &ov.credential, deadline)
                .await;
        }

        let configured = request
            .priority
            .iter()
            .any(|p| !self.store.credentials(*p).is_empty() && self.providers.contains_key(p));
        if !configured {
            warn!("no credentials configured for any provider in the priority list");
            return Err(GenerateError::NotConfigured);
        }

        let mut attempts = Vec::new();
        let mut last_error = String::new();

        'providers: for provider_id in &request.priority {
            let Some(provider) = self.providers.get(provider_id) else {
                warn!(provider = %provider_id, "no adapter registered, skipping");
                continue;
            };
            let credentials = self.store.credentials(*provider_id);
            if credentials.is_empty() {
                debug!(provider = %provider_id, "no credentials, skipping");
                continue;
            }

            for (index, credential) in credentials.iter().enumerate() {
                for model in provider.models() {
                    let Some(timeout) = self.remaining_timeout(deadline) else {
                        last_error = "overall deadline exceeded".to_string();
                        warn!(provider = %provider_id, "overall deadline exceeded, stopping");
                        break 'providers;
                    };

                    match self
                        .attempt(provider.as_ref(), credential, model, &request.prompt, timeout)
                        .await
                    {
                        Ok(text) => {
                            info!(
                                provider = %provider_id,
                                credential = %mask_credential(credential),
                                model = %model,
                                attempts = attempts.len(),
                                "generation succeeded"
                            );
                            return Ok(GenerationResult {
                                text,
                                provider: *provider_id,
                                credential_index: index,
                                credential: mask_credential(credential),
                                model: Some(model.clone()),
                            });
                        }
                        Err(err) => {
                            last_error = err.to_string();
                            attempts.push(record_attempt(*provider_id, index, credential, model, &err));
                        }
                    }
                }
            }
        }

        warn!(attempts = attempts.len(), "all providers exhausted");
        Err(GenerateError::Exhausted(GenerationFailure {
            attempts,
            last_error,
            override_used: false,
        }))
    }

    /// Attempt only the caller's own (provider, credential) pair. The shared
    /// pool is bypassed entirely, even when this pair fails.
    async fn generate_with_override(
        &self,
        request: &GenerationRequest,
        provider_id: ProviderId,
        credential: &str,
        deadline: Option<Instant>,
    ) -> Result<GenerationResult, GenerateError> {
        let Some(provider) = self.providers.get(&provider_id) else {
            warn!(provider = %provider_id, "override credential for unregistered provider");
            return Err(GenerateError::NotConfigured);
        };

        let mut attempts = Vec::new();
        let mut last_error = String::new();

        for model in provider.models() {
            let Some(timeout) = self.remaining_timeout(deadline) else {
                last_error = "overall deadline exceeded".to_string();
                break;
            };

            match self
                .attempt(provider.as_ref(), credential, model, &request.prompt, timeout)
                .await
            {
                Ok(text) => {
                    info!(
                        provider = %provider_id,
                        credential = %mask_credential(credential),
                        "generation succeeded with override credential"
                    );
                    return Ok(GenerationResult {
                        text,
                        provider: provider_id,
                        credential_index: 0,
                        credential: mask_credential(credential),
                        model: Some(model.clone()),
                    });
                }
                Err(err) => {
                    last_error = err.to_string();
                    attempts.push(record_attempt(provider_id, 0, credential, model, &err));
                }
            }
        }

        Err(GenerateError::Exhausted(GenerationFailure {
            attempts,
            last_error,
            override_used: true,
        }))
    }

    /// Per-attempt timeout clamped to the remaining overall budget.
    /// `None` means the budget is already spent.
    fn remaining_timeout(&self, deadline: Option<Instant>) -> Option<Duration> {
        match deadline {
            None => Some(self.options.timeout),
            Some(d) => {
                let remaining = d.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    None
                } else {
                    Some(self.options.timeout.min(remaining))
                }
            }
        }
    }

    /// One adapter call, bounded by `timeout` even if the adapter misbehaves.
    async fn attempt(
        &self,
        provider: &dyn Provider,
        credential: &str,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        debug!(
            provider = %provider.id(),
            credential = %mask_credential(credential),
            model = %model,
            timeout_ms = timeout.as_millis() as u64,
            "attempting generation"
        );

        let mut options = self.options.clone();
        options.timeout = timeout;

        match tokio::time::timeout(timeout, provider.generate(credential, model, prompt, &options))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

fn record_attempt(
    provider: ProviderId,
    credential_index: usize,
    credential: &str,
    model: &str,
    err: &ProviderError,
) -> Attempt {
    debug!(
        provider = %provider,
        credential = %mask_credential(credential),
        model = %model,
        error = %err,
        "attempt failed, advancing"
    );
    Attempt {
        provider,
        credential_index,
        credential: mask_credential(credential),
        model: Some(model.to_string()),
        error: err.to_string(),
        transport: err.is_transport(),
    }
}

pub struct GenerationClientBuilder {
    providers: HashMap<ProviderId, Arc<dyn Provider>>,
    store: CredentialStore,
    options: GenerationOptions,
}

impl GenerationClientBuilder {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            store: CredentialStore::new(),
            options: GenerationOptions::default(),
        }
    }

    /// Register an adapter under its own provider id.
    pub fn with_provider(self, provider: impl Provider + 'static) -> Self {
        self.with_shared_provider(Arc::new(provider))
    }

    /// Register an adapter the caller keeps a handle to.
    pub fn with_shared_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    pub fn with_credentials(mut self, store: CredentialStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> GenerationClient {
        GenerationClient {
            providers: self.providers,
            store: self.store,
            options: self.options,
        }
    }
}

impl Default for GenerationClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
