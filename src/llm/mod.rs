//! Inference client and response handling.
//!
//! The client shapes requests per provider, retries transient network
//! failures with exponential backoff, and hands the raw response text
//! to the extraction chain in [`extract`].

mod extract;
mod prompt;

pub use extract::extract;
pub use prompt::{PromptBuilder, SYSTEM_PROMPT};

use crate::config::{LlmConfig, ProviderKind};
use crate::error::{BotError, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP client for the external text-generation endpoint.
///
/// Retry policy: up to `max_retries` attempts total; only timeouts and
/// transport errors are retried. A non-2xx status fails immediately —
/// it signals a configuration or provider fault that identical retries
/// cannot fix. Backoff doubles between attempts (1s, 2s, 4s).
pub struct InferenceClient {
    http: Client,
    config: LlmConfig,
    api_key: String,
}

impl InferenceClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let api_key = config.api_key();

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    /// Issue the call, returning the response's text content.
    pub async fn call(&self, system_prompt: &str, prompt: &str) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            match self.call_once(system_prompt, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt + 1 < self.config.max_retries => {
                    let delay = Duration::from_secs(1u64 << attempt);
                    tracing::warn!(
                        "inference attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_once(&self, system_prompt: &str, prompt: &str) -> Result<String> {
        let body = self.build_request(system_prompt, prompt);

        let mut req = self.http.post(&self.config.api_url).json(&body);
        match self.config.provider {
            ProviderKind::Gemini => {
                req = req.query(&[("key", self.api_key.as_str())]);
            }
            ProviderKind::OpenAi => {
                if !self.api_key.is_empty() {
                    req = req.header("Authorization", format!("Bearer {}", self.api_key));
                }
            }
        }

        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(BotError::InferenceTimeout),
            Err(e) => return Err(BotError::InferenceTransport(e.to_string())),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body = body.chars().take(500).collect();
            return Err(BotError::InferenceHttp {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = match resp.json().await {
            Ok(v) => v,
            Err(e) if e.is_timeout() => return Err(BotError::InferenceTimeout),
            Err(e) => {
                return Err(BotError::MalformedResponse(format!(
                    "response body is not JSON: {}",
                    e
                )))
            }
        };

        self.extract_text(&value)
    }

    fn build_request(&self, system_prompt: &str, prompt: &str) -> Value {
        match self.config.provider {
            ProviderKind::Gemini => json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": format!("{}\n\n{}", system_prompt, prompt) }],
                }],
                "generationConfig": {
                    "temperature": self.config.temperature,
                    "maxOutputTokens": self.config.max_tokens,
                },
            }),
            ProviderKind::OpenAi => json!({
                "model": self.config.model,
                "messages": [
                    { "role": "system", "content": system_prompt },
                    { "role": "user", "content": prompt },
                ],
                "temperature": self.config.temperature,
                "max_tokens": self.config.max_tokens,
            }),
        }
    }

    fn extract_text(&self, value: &Value) -> Result<String> {
        let text = match self.config.provider {
            ProviderKind::Gemini => value["candidates"][0]["content"]["parts"][0]["text"].as_str(),
            ProviderKind::OpenAi => value["choices"][0]["message"]["content"].as_str(),
        };
        text.map(str::to_string).ok_or_else(|| {
            BotError::MalformedResponse("text-bearing field missing from response".to_string())
        })
    }
}
