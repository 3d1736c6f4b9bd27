//! Priority scheduler over a task graph.
//!
//! Adds three policies on top of `TaskGraph`:
//! - a slot limit: never hand out more than `max_parallel_tasks` minus the
//!   tasks already running
//! - domain exclusivity: a new task in an exclusive domain cancels every
//!   older live task of that domain
//! - safety preemption: while any safety task is ready, only safety tasks
//!   are handed out

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    DomainType, ResultMap, SchedulerConfig, Task, TaskStatus, DEFAULT_TASK_PRIORITY,
};
use crate::services::task_graph::TaskGraph;

/// Task counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub total: usize,
    pub running: usize,
    /// Pending or ready
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// A task cancelled because a newer task took over its domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersededTask {
    pub task_id: String,
    pub superseded_by: String,
}

/// Schedules tasks of one request.
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    config: SchedulerConfig,
    graph: TaskGraph,
    running: HashSet<String>,
}

impl TaskScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            graph: TaskGraph::new(),
            running: HashSet::new(),
        }
    }

    /// Scheduler with default limits and priorities.
    pub fn with_defaults() -> Self {
        Self::new(SchedulerConfig::default())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut TaskGraph {
        &mut self.graph
    }

    /// Add a task to the graph.
    ///
    /// Tasks still at the default priority get their domain's priority. A
    /// live task in an exclusive domain cancels every other live task of
    /// that domain; a task that arrives already cancelled displaces nothing.
    pub fn submit_task(&mut self, mut task: Task) -> DomainResult<Vec<SupersededTask>> {
        if task.priority == DEFAULT_TASK_PRIORITY {
            task.priority = self.config.domain_priorities.for_domain(task.domain);
        }

        let superseded = if task.status == TaskStatus::Cancelled {
            Vec::new()
        } else {
            self.cancel_conflicting(&task)?
        };

        info!(task_id = %task.id, priority = task.priority, domain = %task.domain, "Task submitted");
        self.graph.add_task(task)?;
        Ok(superseded)
    }

    fn is_exclusive(&self, domain: DomainType) -> bool {
        self.config.exclusivity_domains.contains(&domain)
    }

    fn cancel_conflicting(&mut self, new_task: &Task) -> DomainResult<Vec<SupersededTask>> {
        if !self.is_exclusive(new_task.domain) {
            return Ok(Vec::new());
        }

        let conflicting: Vec<String> = self
            .graph
            .all_tasks()
            .filter(|t| t.domain == new_task.domain && !t.is_terminal() && t.id != new_task.id)
            .map(|t| t.id.clone())
            .collect();

        let mut superseded = Vec::with_capacity(conflicting.len());
        for task_id in conflicting {
            self.graph
                .cancel_task(&task_id, format!("superseded by {}", new_task.id))?;
            self.running.remove(&task_id);
            info!(task_id = %task_id, superseded_by = %new_task.id, "Cancelled conflicting task");
            superseded.push(SupersededTask {
                task_id,
                superseded_by: new_task.id.clone(),
            });
        }
        Ok(superseded)
    }

    /// Number of tasks that may start right now.
    pub fn available_slots(&self) -> usize {
        self.config.max_parallel_tasks.saturating_sub(self.running.len())
    }

    /// Next batch of ready tasks, bounded by the free slots.
    pub fn get_next_tasks(&mut self) -> Vec<Task> {
        let slots = self.available_slots();
        if slots == 0 {
            return Vec::new();
        }

        let ready = self.graph.get_ready_tasks();
        let has_safety = ready.iter().any(|t| t.domain == DomainType::Safety);

        ready
            .into_iter()
            .filter(|t| !has_safety || t.domain == DomainType::Safety)
            .take(slots)
            .collect()
    }

    pub fn start_task(&mut self, task_id: &str) -> DomainResult<()> {
        self.graph.start_task(task_id)?;
        self.running.insert(task_id.to_string());
        Ok(())
    }

    pub fn complete_task(&mut self, task_id: &str, result: Option<ResultMap>) -> DomainResult<()> {
        self.running.remove(task_id);
        self.graph.complete_task(task_id, result)
    }

    /// Fail a task; returns the direct dependents that were cancelled.
    pub fn fail_task(&mut self, task_id: &str, error: impl Into<String>) -> DomainResult<Vec<String>> {
        self.running.remove(task_id);
        self.graph.fail_task(task_id, error)
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn is_complete(&self) -> bool {
        self.graph.is_complete()
    }

    pub fn status(&self) -> SchedulerStatus {
        let mut status = SchedulerStatus {
            running: self.running.len(),
            ..Default::default()
        };
        for task in self.graph.all_tasks() {
            status.total += 1;
            match task.status {
                TaskStatus::Pending | TaskStatus::Ready => status.pending += 1,
                TaskStatus::Completed => status.completed += 1,
                TaskStatus::Failed => status.failed += 1,
                TaskStatus::Cancelled => status.cancelled += 1,
                TaskStatus::Running => {}
            }
        }
        status
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::with_defaults()
    }
}
