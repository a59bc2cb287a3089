//! Google Generative Language (Gemini) adapter.
//!
//! The credential travels as a `key` query parameter rather than a header,
//! which is why the URL is built with [`url::Url`] instead of string pasting.

use super::{Provider, ProviderError, check_threshold, sanitize};
use crate::types::{GenerationOptions, ProviderId};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const GEMINI_MODEL: &str = "gemini-2.0-flash-lite";

// Sampling constants observed to work well for this workload.
const TOP_K: u32 = 40;
const TOP_P: f64 = 0.95;

pub struct GoogleProvider {
    models: Vec<String>,
    client: Client,
}

impl GoogleProvider {
    pub fn new() -> Self {
        Self {
            models: vec![GEMINI_MODEL.to_string()],
            client: Client::new(),
        }
    }

    fn endpoint(&self, model: &str, credential: &str) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            &format!("{}/{}:generateContent", BASE_URL, model),
            [("key", credential)],
        )
        .map_err(|e| ProviderError::Http {
            status: 0,
            body: format!("invalid endpoint URL: {}", e),
        })
    }
}

impl Default for GoogleProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    max_output_tokens: u64,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[async_trait]
impl Provider for GoogleProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
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
        let url = self.endpoint(model, credential)?;
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: options.max_tokens,
            },
        };

        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
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

        let content: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, options.timeout))?;

        let text = content
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or(ProviderError::EmptyResponse)?;

        check_threshold(text, options.min_chars)
    }
}
