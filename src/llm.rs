//! Chat-completion client for the answering model.
//!
//! [`ChatModel`] is the seam the agent talks to; [`OpenAiChatClient`] is the
//! production implementation for any OpenAI-compatible
//! `POST {base_url}/chat/completions` endpoint (Groq by default). Each call
//! is a single non-streaming request with an explicit timeout; failures are
//! never retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0} environment variable not set. Export your API key to use the agent.")]
    MissingCredential(String),
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),
    #[error("LLM request failed: {0}")]
    Transport(String),
    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// One completion; returns the assistant message text unmodified.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

pub struct OpenAiChatClient {
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiChatClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            timeout_secs,
            client,
        })
    }

    /// Build a client from `[llm]`, reading the key from `llm.api_key_env`.
    ///
    /// An unset or blank variable is [`LlmError::MissingCredential`].
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingCredential(config.api_key_env.clone()))?;
        Self::new(
            &config.base_url,
            api_key,
            config.model.clone(),
            config.timeout_secs,
        )
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });

        tracing::debug!(model = %self.model, "sending chat completion");
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: Value = res.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout_secs)
            } else {
                LlmError::InvalidResponse(e.to_string())
            }
        })?;
        extract_content(&payload)
    }
}

/// `choices[0].message.content` as a string.
fn extract_content(payload: &Value) -> Result<String, LlmError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            LlmError::InvalidResponse("missing choices[0].message.content".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let payload = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Total revenue was $20." } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        });
        assert_eq!(extract_content(&payload).unwrap(), "Total revenue was $20.");
    }

    #[test]
    fn missing_content_is_invalid_response() {
        let err = extract_content(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn missing_env_var_is_missing_credential() {
        let config = LlmConfig {
            api_key_env: "SALES_AGENT_TEST_UNSET_KEY_7F3A".to_string(),
            ..LlmConfig::default()
        };
        match OpenAiChatClient::from_config(&config) {
            Err(LlmError::MissingCredential(name)) => {
                assert_eq!(name, "SALES_AGENT_TEST_UNSET_KEY_7F3A")
            }
            other => panic!("expected MissingCredential, got {:?}", other.err()),
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client =
            OpenAiChatClient::new("http://localhost:1/v1/", "k".to_string(), "m".to_string(), 5)
                .unwrap();
        assert_eq!(client.base_url, "http://localhost:1/v1");
        assert_eq!(client.model_name(), "m");
    }
}
