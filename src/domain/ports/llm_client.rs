//! LLM client port.
//!
//! The pipeline only ever asks an LLM for a structured JSON object: the
//! classifier uses it as a low-confidence fallback and the reasoning agent
//! uses it for chain-of-thought planning. Adapters implement `generate`;
//! `generate_json` layers fence stripping and parsing on top.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::models::ChatMessage;

/// Errors that can occur when talking to an LLM backend
#[derive(Error, Debug)]
pub enum LlmError {
    /// Invalid request parameters (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing API key (HTTP 401/403)
    #[error("Invalid API key - authentication failed")]
    InvalidApiKey,

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimitExceeded,

    /// Server error from the backend (HTTP 5xx)
    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// The reply carried no usable message content
    #[error("Empty response from model")]
    EmptyResponse,

    /// The reply was not the JSON object we asked for
    #[error("Model returned invalid JSON: {0}")]
    InvalidJson(String),

    /// Unknown or unexpected status
    #[error("Unexpected response ({0}): {1}")]
    Unexpected(u16, String),
}

impl LlmError {
    /// Returns true if this error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded | Self::ServerError(_, _) | Self::Timeout | Self::Network(_)
        )
    }

    /// Returns true if this is a permanent error that should not be retried
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::InvalidApiKey | Self::InvalidJson(_)
        )
    }

    /// Map an HTTP status and body onto an error variant.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            400 => Self::InvalidRequest(body),
            401 | 403 => Self::InvalidApiKey,
            408 => Self::Timeout,
            429 => Self::RateLimitExceeded,
            500..=599 => Self::ServerError(status, body),
            _ => Self::Unexpected(status, body),
        }
    }
}

/// Parse a model reply into JSON, tolerating Markdown code fences.
pub fn extract_json(raw: &str) -> Result<Value, LlmError> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    serde_json::from_str(text.trim()).map_err(|e| LlmError::InvalidJson(e.to_string()))
}

/// Chat-completion style LLM backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Send the conversation and return the raw assistant text.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Send the conversation and parse the reply as a JSON value.
    ///
    /// # Errors
    /// `LlmError::InvalidJson` when the reply does not parse; any transport
    /// error from `generate` otherwise.
    async fn generate_json(&self, messages: &[ChatMessage]) -> Result<Value, LlmError> {
        let raw = self.generate(messages).await?;
        extract_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#"{"type": "navigate_to"}"#).unwrap();
        assert_eq!(value["type"], "navigate_to");
    }

    #[test]
    fn test_extract_fenced_json() {
        let raw = "```json\n{\"intents\": [], \"response\": \"好的\"}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["response"], "好的");

        let bare_fence = "```\n{\"ok\": true}\n```";
        assert_eq!(extract_json(bare_fence).unwrap()["ok"], true);
    }

    #[test]
    fn test_extract_invalid_json() {
        let err = extract_json("sure, here you go").unwrap_err();
        assert!(matches!(err, LlmError::InvalidJson(_)));
        assert!(err.is_permanent());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(LlmError::from_status(401, ""), LlmError::InvalidApiKey));
        assert!(LlmError::from_status(429, "").is_transient());
        assert!(LlmError::from_status(503, "overloaded").is_transient());
        assert!(LlmError::from_status(400, "bad").is_permanent());
        let odd = LlmError::from_status(302, "moved");
        assert!(!odd.is_transient() && !odd.is_permanent());
    }
}
