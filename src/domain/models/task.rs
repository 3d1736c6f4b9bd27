//! Task domain model.
//!
//! Tasks are the executable form of an intent. They live inside a
//! request-scoped task graph and form a DAG through their dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use super::intent::{DomainType, Slots};
use crate::domain::errors::{DomainError, DomainResult};

/// Result payload produced by a task handler.
pub type ResultMap = serde_json::Map<String, serde_json::Value>;

/// Priority assigned to a task when nothing more specific is known.
pub const DEFAULT_TASK_PRIORITY: i32 = 50;

/// Status of a task in the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is defined but dependencies not met
    #[default]
    Pending,
    /// All dependencies completed
    Ready,
    /// Handler is executing
    Running,
    Completed,
    Failed,
    /// Removed by conflict resolution, safety gating, or a failed prerequisite
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "ready" => Some(Self::Ready),
            "running" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check if the task is still waiting to run.
    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::Pending | Self::Ready)
    }

    /// Valid transitions from this status.
    ///
    /// `Running -> Cancelled` exists only for exclusivity preemption.
    pub fn valid_transitions(&self) -> &'static [TaskStatus] {
        match self {
            Self::Pending => &[Self::Ready, Self::Cancelled],
            Self::Ready => &[Self::Running, Self::Cancelled],
            Self::Running => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single executable cockpit action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique within the owning graph
    pub id: String,
    /// Composite `domain:action` name
    pub name: String,
    pub domain: DomainType,
    pub action: String,
    pub params: Slots,
    /// Higher is more urgent
    pub priority: i32,
    pub status: TaskStatus,
    pub dependencies: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<ResultMap>,
    pub error: Option<String>,
}

impl Task {
    /// Create a pending task with a generated id.
    pub fn new(domain: DomainType, action: impl Into<String>) -> Self {
        let action = action.into();
        Self {
            id: generate_task_id(),
            name: format!("{}:{}", domain.as_str(), action),
            domain,
            action,
            params: Slots::new(),
            priority: DEFAULT_TASK_PRIORITY,
            status: TaskStatus::default(),
            dependencies: BTreeSet::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Override the generated id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_params(mut self, params: Slots) -> Self {
        self.params = params;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a dependency. Self-dependencies are ignored.
    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        if task_id != self.id {
            self.dependencies.insert(task_id);
        }
        self
    }

    /// Whether every dependency appears in `completed`.
    pub fn dependencies_met(&self, completed: &BTreeSet<String>) -> bool {
        self.dependencies.iter().all(|dep| completed.contains(dep))
    }

    /// Check if can transition to given status.
    pub fn can_transition_to(&self, new_status: TaskStatus) -> bool {
        self.status.can_transition_to(new_status)
    }

    /// Transition to new status, stamping the matching timestamp.
    pub fn transition_to(&mut self, new_status: TaskStatus) -> DomainResult<()> {
        if !self.can_transition_to(new_status) {
            return Err(DomainError::InvalidStateTransition {
                task_id: self.id.clone(),
                from: self.status,
                to: new_status,
            });
        }

        self.status = new_status;

        match new_status {
            TaskStatus::Running => self.started_at = Some(Utc::now()),
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => {
                self.completed_at = Some(Utc::now());
            }
            TaskStatus::Pending | TaskStatus::Ready => {}
        }

        Ok(())
    }

    /// Walk a waiting task forward to `Running`.
    pub fn mark_running(&mut self) -> DomainResult<()> {
        if self.status == TaskStatus::Pending {
            self.transition_to(TaskStatus::Ready)?;
        }
        self.transition_to(TaskStatus::Running)
    }

    pub fn mark_completed(&mut self, result: Option<ResultMap>) -> DomainResult<()> {
        if self.status.is_waiting() {
            self.mark_running()?;
        }
        self.transition_to(TaskStatus::Completed)?;
        self.result = result;
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> DomainResult<()> {
        if self.status.is_waiting() {
            self.mark_running()?;
        }
        self.transition_to(TaskStatus::Failed)?;
        let error = error.into();
        // A notice stored before execution (e.g. a confirmation request) is kept.
        self.error = Some(match self.error.take() {
            Some(notice) => format!("{notice}; {error}"),
            None => error,
        });
        Ok(())
    }

    /// Cancel the task, optionally recording why.
    pub fn mark_cancelled(&mut self, reason: Option<String>) -> DomainResult<()> {
        self.transition_to(TaskStatus::Cancelled)?;
        if reason.is_some() {
            self.error = reason;
        }
        Ok(())
    }

    /// Check if task is terminal.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Short, log-friendly task id: `task_` plus eight hex digits.
fn generate_task_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("task_{}", &hex[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new(DomainType::Navigation, "navigate_to");
        assert_eq!(task.name, "navigation:navigate_to");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, DEFAULT_TASK_PRIORITY);
        assert!(task.id.starts_with("task_"));
        assert_eq!(task.id.len(), 13);
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = Task::new(DomainType::Music, "play_music");
        let b = Task::new(DomainType::Music, "play_music");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_task_state_transitions() {
        let mut task = Task::new(DomainType::Phone, "make_call");

        assert!(task.can_transition_to(TaskStatus::Ready));
        task.transition_to(TaskStatus::Ready).unwrap();
        task.transition_to(TaskStatus::Running).unwrap();
        assert!(task.started_at.is_some());

        task.transition_to(TaskStatus::Completed).unwrap();
        assert!(task.completed_at.is_some());
        assert!(task.is_terminal());
    }

    #[test]
    fn test_no_transition_out_of_terminal_state() {
        for terminal in [TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Cancelled] {
            let mut task = Task::new(DomainType::Music, "next_track");
            task.status = terminal;
            for target in [
                TaskStatus::Pending,
                TaskStatus::Ready,
                TaskStatus::Running,
                TaskStatus::Completed,
                TaskStatus::Failed,
                TaskStatus::Cancelled,
            ] {
                assert!(task.transition_to(target).is_err());
            }
        }
    }

    #[test]
    fn test_pending_cannot_jump_to_completed_directly() {
        let mut task = Task::new(DomainType::Music, "pause_music");
        let err = task.transition_to(TaskStatus::Completed).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_mark_completed_walks_the_state_machine() {
        let mut task = Task::new(DomainType::VehicleSetting, "set_seat");
        let mut result = ResultMap::new();
        result.insert("status".into(), "success".into());

        task.mark_completed(Some(result)).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.started_at.is_some());
        assert!(task.result.is_some());
    }

    #[test]
    fn test_mark_cancelled_keeps_reason() {
        let mut task = Task::new(DomainType::General, "watch_video");
        task.mark_cancelled(Some("blocked".to_string())).unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert_eq!(task.error.as_deref(), Some("blocked"));
    }

    #[test]
    fn test_mark_failed_keeps_prior_notice() {
        let mut task = Task::new(DomainType::VehicleSetting, "open_window");
        task.error = Some("needs confirmation".to_string());
        task.mark_failed("motor jammed").unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("needs confirmation; motor jammed"));

        let mut plain = Task::new(DomainType::VehicleSetting, "open_window");
        plain.mark_failed("motor jammed").unwrap();
        assert_eq!(plain.error.as_deref(), Some("motor jammed"));
    }

    #[test]
    fn test_self_dependency_ignored() {
        let task = Task::new(DomainType::Music, "play_music").with_id("t1");
        let task = task.with_dependency("t1").with_dependency("t0");
        assert_eq!(task.dependencies.len(), 1);
        assert!(task.dependencies.contains("t0"));
    }
}
