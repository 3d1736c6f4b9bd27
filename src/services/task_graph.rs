//! Request-scoped task DAG.
//!
//! Tracks every task of one request, its dependencies and the set of
//! completed ids, and groups runnable tasks into waves: each wave holds the
//! tasks whose dependencies all sit in earlier waves.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ResultMap, Task, TaskStatus};

// Standalone helper for cycle detection (no self needed)
fn detect_cycle_util<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> bool {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                if detect_cycle_util(neighbor, graph, visited, rec_stack, path) {
                    return true;
                }
            } else if rec_stack.contains(neighbor) {
                if let Some(cycle_start) = path.iter().position(|&id| id == neighbor) {
                    path.drain(0..cycle_start);
                    path.push(neighbor);
                    return true;
                }
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    false
}

/// Directed acyclic graph of tasks for one request.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: HashMap<String, Task>,
    /// Insertion order, used for deterministic iteration
    order: Vec<String>,
    completed: BTreeSet<String>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Ids must be unique within the graph.
    pub fn add_task(&mut self, task: Task) -> DomainResult<()> {
        if self.tasks.contains_key(&task.id) {
            return Err(DomainError::ValidationFailed(format!(
                "task id {} already exists in graph",
                task.id
            )));
        }
        self.order.push(task.id.clone());
        if task.status == TaskStatus::Completed {
            self.completed.insert(task.id.clone());
        }
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Make `task_id` depend on `depends_on`.
    ///
    /// Returns false, changing nothing, when either id is absent or both are
    /// the same task.
    pub fn add_dependency(&mut self, task_id: &str, depends_on: &str) -> bool {
        if task_id == depends_on || !self.tasks.contains_key(depends_on) {
            return false;
        }
        match self.tasks.get_mut(task_id) {
            Some(task) => {
                task.dependencies.insert(depends_on.to_string());
                true
            }
            None => false,
        }
    }

    /// Tasks whose dependencies have all completed, highest priority first.
    ///
    /// Pending tasks that qualify are promoted to `Ready`. Calling this twice
    /// without any other mutation returns the same set.
    pub fn get_ready_tasks(&mut self) -> Vec<Task> {
        let mut ready = Vec::new();
        for id in &self.order {
            let Some(task) = self.tasks.get_mut(id) else {
                continue;
            };
            match task.status {
                TaskStatus::Pending if task.dependencies_met(&self.completed) => {
                    task.status = TaskStatus::Ready;
                    ready.push(task.clone());
                }
                TaskStatus::Ready => ready.push(task.clone()),
                _ => {}
            }
        }
        ready.sort_by(|a, b| b.priority.cmp(&a.priority));
        ready
    }

    /// Move a waiting task to `Running`.
    pub fn start_task(&mut self, task_id: &str) -> DomainResult<()> {
        self.task_mut(task_id)?.mark_running()
    }

    pub fn complete_task(&mut self, task_id: &str, result: Option<ResultMap>) -> DomainResult<()> {
        self.task_mut(task_id)?.mark_completed(result)?;
        self.completed.insert(task_id.to_string());
        Ok(())
    }

    /// Fail a task and cancel its direct dependents that have not started.
    ///
    /// The cascade is one level deep: dependents of a cancelled dependent
    /// are left alone. Returns the ids that were cancelled.
    pub fn fail_task(&mut self, task_id: &str, error: impl Into<String>) -> DomainResult<Vec<String>> {
        self.task_mut(task_id)?.mark_failed(error)?;

        let mut cancelled = Vec::new();
        for id in &self.order {
            let Some(other) = self.tasks.get_mut(id) else {
                continue;
            };
            if other.dependencies.contains(task_id) && other.status.is_waiting() {
                other.mark_cancelled(Some(format!("dependency {task_id} failed")))?;
                cancelled.push(id.clone());
            }
        }
        if !cancelled.is_empty() {
            debug!(task_id, ?cancelled, "cancelled direct dependents of failed task");
        }
        Ok(cancelled)
    }

    /// Cancel a task, recording why.
    pub fn cancel_task(&mut self, task_id: &str, reason: impl Into<String>) -> DomainResult<()> {
        self.task_mut(task_id)?.mark_cancelled(Some(reason.into()))
    }

    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    fn task_mut(&mut self, task_id: &str) -> DomainResult<&mut Task> {
        self.tasks
            .get_mut(task_id)
            .ok_or_else(|| DomainError::TaskNotFound(task_id.to_string()))
    }

    /// All tasks in insertion order.
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn completed_ids(&self) -> &BTreeSet<String> {
        &self.completed
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether every task reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.tasks.values().all(Task::is_terminal)
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.order.clear();
        self.completed.clear();
    }

    /// Group non-cancelled, non-failed tasks into execution waves.
    ///
    /// Planning stops at the first pass that places nothing; tasks left over
    /// (cycles, or dependencies on cancelled tasks) are logged and omitted.
    pub fn get_execution_order(&self) -> Vec<Vec<String>> {
        let (waves, stranded) = self.plan_waves();
        if !stranded.is_empty() {
            warn!(?stranded, "tasks can never become ready and were left out of the plan");
        }
        waves
    }

    /// Like `get_execution_order`, but reports tasks that can never run.
    ///
    /// # Errors
    /// `DependencyCycle` with the cycle path when one exists, otherwise
    /// `UnreachableTasks` listing every stranded task.
    pub fn execution_waves(&self) -> DomainResult<Vec<Vec<String>>> {
        let (waves, stranded) = self.plan_waves();
        if stranded.is_empty() {
            return Ok(waves);
        }
        if let Some(cycle) = self.detect_cycle() {
            return Err(DomainError::DependencyCycle(cycle));
        }
        Err(DomainError::UnreachableTasks(stranded))
    }

    fn plan_waves(&self) -> (Vec<Vec<String>>, Vec<String>) {
        let mut remaining: Vec<&Task> = self
            .all_tasks()
            .filter(|t| !matches!(t.status, TaskStatus::Cancelled | TaskStatus::Failed))
            .collect();
        let mut placed: BTreeSet<String> = BTreeSet::new();
        let mut waves = Vec::new();

        while !remaining.is_empty() {
            let (mut wave, rest): (Vec<&Task>, Vec<&Task>) =
                remaining.into_iter().partition(|t| t.dependencies_met(&placed));
            remaining = rest;
            if wave.is_empty() {
                break;
            }
            wave.sort_by(|a, b| b.priority.cmp(&a.priority));
            let ids: Vec<String> = wave.iter().map(|t| t.id.clone()).collect();
            placed.extend(ids.iter().cloned());
            waves.push(ids);
        }

        let stranded = remaining.iter().map(|t| t.id.clone()).collect();
        (waves, stranded)
    }

    /// Find a dependency cycle, returned as a closed path `a -> b -> a`.
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        let graph: HashMap<&str, Vec<&str>> = self
            .all_tasks()
            .map(|t| {
                let deps = t
                    .dependencies
                    .iter()
                    .map(String::as_str)
                    .filter(|dep| self.tasks.contains_key(*dep))
                    .collect();
                (t.id.as_str(), deps)
            })
            .collect();

        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for id in &self.order {
            if !visited.contains(id.as_str())
                && detect_cycle_util(id, &graph, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(path.into_iter().map(str::to_string).collect());
            }
        }
        None
    }
}
