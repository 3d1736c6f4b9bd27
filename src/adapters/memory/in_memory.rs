//! Process-local conversation memory.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ChatMessage, MemoryConfig, MemoryContext, Preference, Role};
use crate::domain::ports::ConversationMemory;

/// Evicted turns kept in the working summary.
const MAX_SUMMARY_LINES: usize = 10;

#[derive(Debug, Default)]
struct MemoryState {
    recent: VecDeque<ChatMessage>,
    evicted: VecDeque<String>,
    last_user_input: Option<String>,
    last_assistant_response: Option<String>,
    preferences: Vec<Preference>,
}

impl MemoryState {
    fn push(&mut self, message: ChatMessage, capacity: usize) {
        match message.role {
            Role::User => self.last_user_input = Some(message.content.clone()),
            Role::Assistant => self.last_assistant_response = Some(message.content.clone()),
            Role::System => {}
        }
        self.recent.push_back(message);
        while self.recent.len() > capacity {
            let Some(old) = self.recent.pop_front() else {
                break;
            };
            self.evicted
                .push_back(format!("{}: {}", old.role.as_str(), old.content));
            if self.evicted.len() > MAX_SUMMARY_LINES {
                self.evicted.pop_front();
            }
        }
    }

    /// Evicted turns, oldest first, then the latest exchange.
    fn working_summary(&self) -> String {
        let mut lines: Vec<String> = self.evicted.iter().cloned().collect();
        if let Some(input) = &self.last_user_input {
            lines.push(format!("last_user_input: {input}"));
        }
        if let Some(reply) = &self.last_assistant_response {
            lines.push(format!("last_assistant_response: {reply}"));
        }
        lines.join("\n")
    }
}

/// Bounded in-memory conversation store.
///
/// Keeps the last `max_recent_messages` turns and a keyed preference list.
/// Turns that fall out of the window are rolled into the working summary.
/// Nothing survives the process.
#[derive(Debug)]
pub struct InMemoryConversation {
    capacity: usize,
    state: RwLock<MemoryState>,
}

impl InMemoryConversation {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            capacity: config.max_recent_messages.max(1),
            state: RwLock::new(MemoryState::default()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MemoryConfig::default())
    }

    /// Forget turns and preferences.
    pub async fn clear(&self) {
        *self.state.write().await = MemoryState::default();
    }

    async fn push(&self, message: ChatMessage) -> DomainResult<()> {
        if message.content.trim().is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "empty {} message",
                message.role.as_str()
            )));
        }
        self.state.write().await.push(message, self.capacity);
        Ok(())
    }
}

impl Default for InMemoryConversation {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl ConversationMemory for InMemoryConversation {
    async fn add_user_message(&self, content: &str) -> DomainResult<()> {
        self.push(ChatMessage::user(content)).await
    }

    async fn add_assistant_message(&self, content: &str) -> DomainResult<()> {
        self.push(ChatMessage::assistant(content)).await
    }

    async fn set_preference(&self, key: &str, content: &str) -> DomainResult<()> {
        if key.trim().is_empty() {
            return Err(DomainError::ValidationFailed("empty preference key".to_string()));
        }

        let mut state = self.state.write().await;
        match state.preferences.iter_mut().find(|p| p.key == key) {
            Some(existing) => existing.content = content.to_string(),
            None => state.preferences.push(Preference {
                key: key.to_string(),
                content: content.to_string(),
            }),
        }
        Ok(())
    }

    async fn get_context(&self) -> DomainResult<MemoryContext> {
        let state = self.state.read().await;
        Ok(MemoryContext {
            working_summary: state.working_summary(),
            recent_messages: state.recent.iter().cloned().collect(),
            preferences: state.preferences.clone(),
        })
    }
}
