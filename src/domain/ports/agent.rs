use async_trait::async_trait;

use crate::domain::models::{AgentContext, AgentResponse};

/// An agent turns one utterance plus context into a response.
///
/// Implementations never fail outright: collaborator errors degrade into a
/// lower-confidence response instead.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logs and response metadata
    fn name(&self) -> &str;

    async fn process(&self, user_input: &str, context: &AgentContext) -> AgentResponse;
}
