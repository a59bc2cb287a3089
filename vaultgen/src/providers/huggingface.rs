//! HuggingFace Inference API adapter.
//!
//! The only multi-model provider: the client retries a single key across each
//! model endpoint before rotating to the next key. The response envelope
//! varies (array, object, or bare string) and some models echo the prompt back
//! at the front of the generated text, which must be stripped.

use super::{Provider, ProviderError, check_threshold, sanitize};
use crate::types::{GenerationOptions, ProviderId};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Candidate models, in fallback order.
pub const HF_MODELS: [&str; 2] = [
    "Qwen/Qwen2.5-72B-Instruct",
    "meta-llama/Llama-3.1-70B-Instruct",
];

pub struct HuggingFaceProvider {
    models: Vec<String>,
    client: Client,
}

impl HuggingFaceProvider {
    pub fn new() -> Self {
        Self {
            models: HF_MODELS.iter().map(|m| m.to_string()).collect(),
            client: Client::new(),
        }
    }
}

impl Default for HuggingFaceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u64,
    temperature: f64,
    top_p: f64,
    do_sample: bool,
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: Option<String>,
}

/// Pull generated text out of whichever envelope the inference API used.
fn extract_text(value: Value) -> Option<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .next()
            .and_then(|v| serde_json::from_value::<GeneratedText>(v).ok())
            .and_then(|g| g.generated_text),
        Value::String(s) => Some(s),
        obj @ Value::Object(_) => serde_json::from_value::<GeneratedText>(obj)
            .ok()
            .and_then(|g| g.generated_text),
        _ => None,
    }
}

/// Some models return the prompt verbatim at the head of the completion.
fn strip_echoed_prompt(text: &str, prompt: &str) -> String {
    match text.strip_prefix(prompt) {
        Some(rest) => rest.trim().to_string(),
        None => text.trim().to_string(),
    }
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn id(&self) -> ProviderId {
        ProviderId::HuggingFace
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    async fn generate(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        let body = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: options.max_tokens,
                temperature: options.temperature,
                top_p: 0.95,
                do_sample: true,
            },
        };

        let resp = self
            .client
            .post(format!("{}/{}", BASE_URL, model))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", credential))
            .timeout(options.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, options.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: sanitize::sanitize_error_body(&body_text),
            });
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, options.timeout))?;

        let text = extract_text(value).ok_or(ProviderError::EmptyResponse)?;
        let text = strip_echoed_prompt(&text, prompt);

        check_threshold(text, options.min_chars)
    }
}
