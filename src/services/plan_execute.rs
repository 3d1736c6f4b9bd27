//! Plan-and-execute agent.
//!
//! Turns the intents of one request into a task DAG, gates each sub-task
//! on the driving state, runs the DAG wave by wave and folds the handler
//! results into a single response.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::DomainError;
use crate::domain::models::{
    AgentContext, AgentResponse, DomainType, ResultMap, SchedulerConfig, Task, TaskStatus,
    CONFIRMATION_NOTICE,
};
use crate::domain::ports::Agent;
use crate::services::safety_gate::{confirmation_notice, SafetyGate};
use crate::services::task_executor::{TaskExecutor, TaskHandler};
use crate::services::task_scheduler::TaskScheduler;

pub const NOTHING_EXECUTABLE: &str = "无法识别可执行的任务";
pub const ALL_CANCELLED: &str = "所有任务已被取消或无法执行";
pub const ALL_DONE: &str = "所有任务执行完成";
pub const MESSAGE_SEPARATOR: &str = "；";

/// A task removed from the plan, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelledTask {
    pub task_id: String,
    pub reason: String,
}

/// Plans and executes the intents of one request.
pub struct PlanExecuteAgent {
    executor: TaskExecutor,
    safety_gate: SafetyGate,
    scheduler_config: SchedulerConfig,
    permits: Arc<Semaphore>,
}

impl PlanExecuteAgent {
    pub fn new(executor: TaskExecutor, safety_gate: SafetyGate, scheduler_config: SchedulerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(scheduler_config.max_parallel_tasks.max(1)));
        Self {
            executor,
            safety_gate,
            scheduler_config,
            permits,
        }
    }

    /// Agent with default executor, safety rules and limits.
    pub fn with_defaults() -> Self {
        let config = SchedulerConfig::default();
        Self::new(TaskExecutor::new(&config), SafetyGate::with_defaults(), config)
    }

    /// Share an admission semaphore with other agents.
    pub fn with_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.permits = permits;
        self
    }

    /// Install a custom handler for `action`.
    pub fn register_handler(&mut self, action: impl Into<String>, handler: impl TaskHandler + 'static) {
        self.executor.register_handler(action, handler);
    }

    #[instrument(skip_all, fields(intents = context.intent_results.len(), driving_state = %context.driving_state))]
    async fn plan_and_execute(&self, user_input: &str, context: &AgentContext) -> AgentResponse {
        if context.intent_results.is_empty() {
            return AgentResponse::new(NOTHING_EXECUTABLE, 0.0);
        }

        let mut scheduler = TaskScheduler::new(self.scheduler_config.clone());
        let mut cancelled: Vec<CancelledTask> = Vec::new();
        let mut safety_warnings: Vec<String> = Vec::new();

        for intent_result in &context.intent_results {
            let intent = intent_result.to_intent(user_input);
            let mut task = self.executor.intent_to_task(&intent);
            let verdict = self.safety_gate.check(&intent, context.driving_state);
            safety_warnings.extend(verdict.warnings.iter().cloned());

            if !verdict.is_safe {
                if let Err(e) = task.mark_cancelled(Some(verdict.blocked_reason.clone())) {
                    warn!(task_id = %task.id, error = %e, "could not cancel unsafe task");
                }
                cancelled.push(CancelledTask {
                    task_id: task.id.clone(),
                    reason: verdict.blocked_reason,
                });
            } else if verdict.requires_confirmation {
                task.error = Some(confirmation_notice(&task.action));
            }

            match scheduler.submit_task(task) {
                Ok(superseded) => cancelled.extend(superseded.into_iter().map(|s| CancelledTask {
                    reason: format!("superseded by {}", s.superseded_by),
                    task_id: s.task_id,
                })),
                Err(e) => warn!(error = %e, "dropping task that could not be submitted"),
            }
        }

        link_safety_prerequisites(&mut scheduler);

        let waves = scheduler.graph().get_execution_order();
        info!(waves = waves.len(), tasks = scheduler.graph().len(), "execution plan ready");

        let mut task_results: Vec<ResultMap> = Vec::new();
        for (wave_idx, wave) in waves.iter().enumerate() {
            self.execute_wave(wave_idx, wave, &mut scheduler, &mut task_results, &mut cancelled)
                .await;
        }

        cancel_stranded(&mut scheduler, &mut cancelled);

        let requires_confirmation = scheduler.graph().all_tasks().any(|t| {
            t.error
                .as_deref()
                .is_some_and(|e| e.contains(CONFIRMATION_NOTICE))
        });

        let mut response = aggregate(task_results);
        response.requires_confirmation = requires_confirmation;
        response.metadata.insert("execution_waves".into(), json!(waves));
        response
            .metadata
            .insert("cancelled_tasks".into(), json!(cancelled));
        response
            .metadata
            .insert("task_status".into(), json!(scheduler.status()));
        if !safety_warnings.is_empty() {
            response
                .metadata
                .insert("safety_warnings".into(), json!(safety_warnings));
        }
        response
    }

    /// Execute one wave with bounded parallelism and record every outcome.
    async fn execute_wave(
        &self,
        wave_idx: usize,
        wave: &[String],
        scheduler: &mut TaskScheduler,
        task_results: &mut Vec<ResultMap>,
        cancelled: &mut Vec<CancelledTask>,
    ) {
        let runnable: Vec<Task> = wave
            .iter()
            .filter_map(|id| scheduler.graph().get_task(id))
            .filter(|t| !matches!(t.status, TaskStatus::Cancelled | TaskStatus::Failed))
            .cloned()
            .collect();
        debug!(wave = wave_idx + 1, tasks = runnable.len(), "starting wave");

        let mut handles = Vec::with_capacity(runnable.len());
        for task in runnable {
            let task_id = task.id.clone();
            let permit = match self.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    record_failure(scheduler, &task_id, "admission semaphore closed", task_results, cancelled);
                    continue;
                }
            };

            if let Err(e) = scheduler.start_task(&task_id) {
                warn!(task_id = %task_id, error = %e, "task could not start");
                continue;
            }

            let executor = self.executor.clone();
            let handle =
                tokio::spawn(async move { executor.execute_with_permit(task, permit).await });
            handles.push((task_id, handle));
        }

        for (task_id, handle) in handles {
            let outcome = handle.await.unwrap_or_else(|join_err| {
                Err(DomainError::HandlerFailed {
                    action: task_id.clone(),
                    reason: join_err.to_string(),
                })
            });

            match outcome {
                Ok(result) => {
                    if let Err(e) = scheduler.complete_task(&task_id, Some(result.clone())) {
                        warn!(task_id = %task_id, error = %e, "could not record completion");
                    }
                    task_results.push(result);
                }
                Err(e) => {
                    warn!(task_id = %task_id, error = %e, "task failed");
                    record_failure(scheduler, &task_id, &e.to_string(), task_results, cancelled);
                }
            }
        }
    }
}

impl Default for PlanExecuteAgent {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl Agent for PlanExecuteAgent {
    fn name(&self) -> &str {
        "plan_execute_agent"
    }

    async fn process(&self, user_input: &str, context: &AgentContext) -> AgentResponse {
        self.plan_and_execute(user_input, context).await
    }
}

/// Every non-safety task waits for every safety task of the batch.
fn link_safety_prerequisites(scheduler: &mut TaskScheduler) {
    let (safety, others): (Vec<&Task>, Vec<&Task>) = scheduler
        .graph()
        .all_tasks()
        .partition(|t| t.domain == DomainType::Safety);
    let safety_ids: Vec<String> = safety.iter().map(|t| t.id.clone()).collect();
    let other_ids: Vec<String> = others.iter().map(|t| t.id.clone()).collect();

    let graph = scheduler.graph_mut();
    for task_id in &other_ids {
        for safety_id in &safety_ids {
            graph.add_dependency(task_id, safety_id);
        }
    }
}

fn record_failure(
    scheduler: &mut TaskScheduler,
    task_id: &str,
    error: &str,
    task_results: &mut Vec<ResultMap>,
    cancelled: &mut Vec<CancelledTask>,
) {
    match scheduler.fail_task(task_id, error) {
        Ok(dependents) => cancelled.extend(dependents.into_iter().map(|id| CancelledTask {
            task_id: id,
            reason: format!("dependency {task_id} failed"),
        })),
        Err(e) => warn!(task_id, error = %e, "could not record failure"),
    }

    let mut failure = ResultMap::new();
    failure.insert("status".into(), json!("failed"));
    failure.insert("task".into(), json!(task_id));
    failure.insert("error".into(), json!(error));
    task_results.push(failure);
}

/// Cancel tasks the plan could never reach.
fn cancel_stranded(scheduler: &mut TaskScheduler, cancelled: &mut Vec<CancelledTask>) {
    let stranded: Vec<String> = scheduler
        .graph()
        .all_tasks()
        .filter(|t| t.status.is_waiting())
        .map(|t| t.id.clone())
        .collect();

    for task_id in stranded {
        let reason = "dependencies can never be satisfied".to_string();
        if scheduler.graph_mut().cancel_task(&task_id, reason.clone()).is_ok() {
            cancelled.push(CancelledTask { task_id, reason });
        }
    }
}

/// Fold handler results into the user-facing response.
fn aggregate(task_results: Vec<ResultMap>) -> AgentResponse {
    let total = task_results.len();
    let succeeded = task_results
        .iter()
        .filter(|r| r.get("status").and_then(|s| s.as_str()) == Some("success"))
        .count();

    let content = if total == 0 {
        ALL_CANCELLED.to_string()
    } else if succeeded == total {
        let messages: Vec<&str> = task_results
            .iter()
            .filter_map(|r| r.get("message").and_then(|m| m.as_str()))
            .filter(|m| !m.is_empty())
            .collect();
        if messages.is_empty() {
            ALL_DONE.to_string()
        } else {
            messages.join(MESSAGE_SEPARATOR)
        }
    } else {
        format!("已完成 {succeeded}/{total} 个任务")
    };

    let mut response = AgentResponse::new(content, succeeded as f64 / total.max(1) as f64);
    response.task_results = task_results;
    response
}
