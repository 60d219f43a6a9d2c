//! Pluggable LLM capability: the News Analyzer depends on
//! `analyze(prompt) -> String`, not on a specific provider, so it's
//! testable against a fake without network access.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn analyze(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// Thin client against an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiLlmClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiLlmClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".into(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
    async fn analyze(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.1,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!("provider returned error: {text}")));
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| LlmError::Provider(e.to_string()))?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_else(|| "[]".to_string()))
    }
}

/// The system prompt demanded by the News Analyzer's pipeline: a JSON
/// array of `{ticker_keyword, side, prob_shift, confidence, rationale}`.
pub const NEWS_SYSTEM_PROMPT: &str = "\
You are a quantitative analyst for a prediction-market trading desk.

Given a news headline or data release, you must:
1. Determine if it is relevant to any contract on the exchange.
2. If relevant, output a JSON array of objects with these fields:
   - \"ticker_keyword\": a short keyword that would appear in the contract's
     ticker or title.
   - \"side\": \"yes\" or \"no\" — the direction the news pushes the probability.
   - \"prob_shift\": a float between -1.0 and 1.0, the estimated absolute
     shift in the YES probability.
   - \"confidence\": 0.0-1.0 how confident you are.
   - \"rationale\": one sentence.
3. If not relevant, return an empty JSON array: []

Return ONLY valid JSON. No markdown fences.";
