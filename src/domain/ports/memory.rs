use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::MemoryContext;

/// Conversational memory consulted and updated once per request.
///
/// Failures surface as `DomainError::MemoryFailure`; callers log them and
/// carry on with an empty context.
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Record the driver's utterance
    async fn add_user_message(&self, content: &str) -> DomainResult<()>;

    /// Record the assistant's reply
    async fn add_assistant_message(&self, content: &str) -> DomainResult<()>;

    /// Remember a preference, replacing any previous value for `key`
    async fn set_preference(&self, key: &str, content: &str) -> DomainResult<()>;

    /// Snapshot of summary, recent turns and preferences
    async fn get_context(&self) -> DomainResult<MemoryContext>;
}
