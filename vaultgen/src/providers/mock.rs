//! Configurable in-process adapter for exercising the fallback loop without
//! network access. Outcomes are scripted per (credential, model) pair and
//! every call is recorded so tests can assert exact attempt ordering.

use super::{Provider, ProviderError, check_threshold};
use crate::types::{GenerationOptions, ProviderId};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Outcome = Box<dyn Fn(&str, &str) -> Result<String, ProviderError> + Send + Sync>;

pub struct MockProvider {
    id: ProviderId,
    models: Vec<String>,
    outcome: Outcome,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, String)>>,
    call_count: AtomicUsize,
}

impl MockProvider {
    pub fn new(
        id: ProviderId,
        outcome: impl Fn(&str, &str) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            models: vec!["mock-model".to_string()],
            outcome: Box::new(outcome),
            delay: None,
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Always returns the given text, regardless of credential and model.
    pub fn always_succeeds(id: ProviderId, text: &str) -> Self {
        let text = text.to_string();
        Self::new(id, move |_, _| Ok(text.clone()))
    }

    /// Fails every call with an HTTP 503.
    pub fn always_fails(id: ProviderId) -> Self {
        Self::new(id, |_, _| {
            Err(ProviderError::Http {
                status: 503,
                body: "service unavailable".into(),
            })
        })
    }

    /// Succeeds only for the given (credential, model) pair; every other call
    /// fails with an HTTP 429.
    pub fn succeeds_only_for(id: ProviderId, credential: &str, model: &str, text: &str) -> Self {
        let credential = credential.to_string();
        let model = model.to_string();
        let text = text.to_string();
        Self::new(id, move |c, m| {
            if c == credential && m == model {
                Ok(text.clone())
            } else {
                Err(ProviderError::Http {
                    status: 429,
                    body: "rate limited".into(),
                })
            }
        })
    }

    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Sleep this long before producing the outcome, to simulate a provider
    /// that hangs past the attempt timeout.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Recorded (credential, model) pairs, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    async fn generate(
        &self,
        credential: &str,
        model: &str,
        _prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((credential.to_string(), model.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        // Same acceptance threshold as the real adapters.
        (self.outcome)(credential, model).and_then(|t| check_threshold(t, options.min_chars))
    }
}
