//! OpenAI-compatible chat-completions judge.
//!
//! Status handling:
//! - HTTP 429 → [`JudgeError::RateLimited`] (with `Retry-After` when sent)
//! - HTTP 5xx and network errors → [`JudgeError::Unavailable`]
//! - other HTTP 4xx → [`JudgeError::Rejected`]
//!
//! Retries are the caller's job; see `ContrastiveClassifier::ask`.

use std::time::Duration;

use async_trait::async_trait;
use knot_core::config::LlmConfig;
use serde_json::{Value, json};

use crate::contrastive::judge::{JudgeError, RelatednessJudge};

/// Judge backed by `POST {base_url}/chat/completions`.
pub struct OpenAiJudge {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    timeout_secs: u64,
}

impl OpenAiJudge {
    /// Build a judge from settings, reading the key from `llm.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns [`JudgeError::NotConfigured`] if the key variable is unset or
    /// the HTTP client cannot be built.
    pub fn from_config(llm: &LlmConfig) -> Result<Self, JudgeError> {
        let api_key = std::env::var(&llm.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| JudgeError::NotConfigured(format!("{} not set", llm.api_key_env)))?;
        Self::with_api_key(llm, api_key)
    }

    /// Build a judge with an explicit key.
    ///
    /// # Errors
    ///
    /// Returns [`JudgeError::NotConfigured`] if the HTTP client cannot be built.
    pub fn with_api_key(llm: &LlmConfig, api_key: String) -> Result<Self, JudgeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()
            .map_err(|e| JudgeError::NotConfigured(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", llm.base_url.trim_end_matches('/')),
            api_key,
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            timeout_secs: llm.timeout_secs,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        })
    }
}

#[async_trait]
impl RelatednessJudge for OpenAiJudge {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify(&self, prompt: &str) -> Result<String, JudgeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    JudgeError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    JudgeError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000));
            return Err(JudgeError::RateLimited { retry_after_ms });
        }
        if status.is_server_error() {
            return Err(JudgeError::Unavailable(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JudgeError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| JudgeError::Malformed(e.to_string()))?;
        parse_chat_reply(&json)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions reply.
fn parse_chat_reply(json: &Value) -> Result<String, JudgeError> {
    json.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| JudgeError::Malformed("missing choices[0].message.content".to_string()))
}
