//! Chat-completions client for OpenAI-compatible endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::retry::RetryPolicy;
use crate::domain::models::{ChatMessage, LlmConfig};
use crate::domain::ports::{LlmClient, LlmError};

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for `POST {api_base}/chat/completions`.
///
/// Transient failures (429, 5xx, timeouts, connection errors) are retried
/// with exponential backoff.
pub struct OpenAiCompatClient {
    http_client: ReqwestClient,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry_policy: RetryPolicy,
}

impl OpenAiCompatClient {
    /// Build a client from configuration.
    ///
    /// Fails when neither `llm.api_key` nor `OPENAI_API_KEY` provides a key.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
            .with_context(|| format!("No LLM API key configured (set llm.api_key or {API_KEY_ENV})"))?;

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry_policy: RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(LlmError::from_status(status.as_u16(), body));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidJson(e.to_string()))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

fn transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Network(err.to_string())
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai_compat"
    }

    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let reply = self
            .retry_policy
            .execute(|| self.send_request(&request))
            .await?;
        debug!(chars = reply.chars().count(), "LLM reply received");
        Ok(reply)
    }
}
