//! Mock LLM client for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::models::ChatMessage;
use crate::domain::ports::{LlmClient, LlmError};

/// Mock reply configuration.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw assistant text, parsed by `generate_json` like a real reply
    Text(String),
    /// Simulated transport failure
    Failure(String),
}

/// LLM client that returns a canned reply and records what it was sent.
pub struct MockLlmClient {
    reply: MockReply,
    calls: AtomicUsize,
    last_messages: RwLock<Vec<ChatMessage>>,
}

impl MockLlmClient {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_messages: RwLock::new(Vec::new()),
        }
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(MockReply::Text(text.into()))
    }

    pub fn with_json(value: Value) -> Self {
        Self::with_text(value.to_string())
    }

    pub fn failing(error: impl Into<String>) -> Self {
        Self::new(MockReply::Failure(error.into()))
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages sent with the most recent call.
    pub async fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.read().await.clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.write().await = messages.to_vec();

        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Failure(error) => Err(LlmError::Network(error.clone())),
        }
    }
}
