//! OpenAI-compatible chat-completions adapter.
//!
//! Perplexity and Groq speak the same wire format and differ only in base URL
//! and model, so both are instances of this adapter.

use super::{Provider, ProviderError, check_threshold, sanitize};
use crate::types::{GenerationOptions, ProviderId};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const PERPLEXITY_URL: &str = "https://api.perplexity.ai/chat/completions";
pub const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

pub const PERPLEXITY_MODEL: &str = "sonar";
pub const GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Adapter for providers speaking OpenAI `POST /chat/completions`.
pub struct OpenAiCompatibleProvider {
    id: ProviderId,
    url: String,
    models: Vec<String>,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: ProviderId, url: &str, model: &str) -> Self {
        Self {
            id,
            url: url.to_string(),
            models: vec![model.to_string()],
            client: Client::new(),
        }
    }

    pub fn perplexity() -> Self {
        Self::new(ProviderId::Perplexity, PERPLEXITY_URL, PERPLEXITY_MODEL)
    }

    pub fn groq() -> Self {
        Self::new(ProviderId::Groq, GROQ_URL, GROQ_MODEL)
    }
}

// ---- Request/response types (OpenAI wire format) ----

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMsg<'a>>,
    temperature: f64,
    max_tokens: u64,
}

#[derive(Serialize)]
struct ChatMsg<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
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
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model,
            messages: vec![ChatMsg {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let resp = self
            .client
            .post(&self.url)
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

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, options.timeout))?;

        let text = chat_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ProviderError::EmptyResponse)?;

        check_threshold(text, options.min_chars)
    }
}
