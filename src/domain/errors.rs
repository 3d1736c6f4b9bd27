//! Domain errors for the cockpit orchestration pipeline.

use thiserror::Error;

use super::models::TaskStatus;

/// Format a cycle path as a human-readable string: `A -> B -> C -> A`.
fn format_cycle_path(path: &[String]) -> String {
    path.join(" -> ")
}

/// Domain-level errors that can occur while orchestrating cockpit tasks.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid state transition for task {task_id} from {from} to {to}")]
    InvalidStateTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Task dependency cycle detected: {}", format_cycle_path(.0))]
    DependencyCycle(Vec<String>),

    #[error("Tasks can never become ready: {0:?}")]
    UnreachableTasks(Vec<String>),

    #[error("Handler for '{action}' failed: {reason}")]
    HandlerFailed { action: String, reason: String },

    #[error("Task {task_id} exceeded its {timeout_ms}ms execution deadline")]
    TaskTimeout { task_id: String, timeout_ms: u64 },

    #[error("Scheduler capacity exhausted ({0} tasks running)")]
    CapacityExhausted(usize),

    #[error("LLM collaborator failed: {0}")]
    LlmFailure(String),

    #[error("Memory collaborator failed: {0}")]
    MemoryFailure(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
