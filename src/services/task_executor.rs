//! Intent-to-task conversion and domain handler dispatch.
//!
//! Built-in handlers are a closed set of kinds selected by action name.
//! `register_handler` installs an override that takes precedence over the
//! built-in kind for one action. Handlers only simulate the cockpit: they
//! describe what would happen and echo their parameters.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DomainPriorities, Intent, ResultMap, SchedulerConfig, Task};

/// Outcome of a handler; the error text becomes the task's error.
pub type HandlerResult = Result<ResultMap, String>;

/// A custom handler for one action.
pub trait TaskHandler: Send + Sync {
    fn handle(&self, task: &Task) -> HandlerResult;
}

impl<F> TaskHandler for F
where
    F: Fn(&Task) -> HandlerResult + Send + Sync,
{
    fn handle(&self, task: &Task) -> HandlerResult {
        self(task)
    }
}

/// Built-in handler families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Navigation,
    Phone,
    Music,
    Vehicle,
    Safety,
}

impl HandlerKind {
    /// Built-in handler for an action, if any.
    pub fn for_action(action: &str) -> Option<Self> {
        match action {
            "navigate_to" | "search_poi" => Some(Self::Navigation),
            "make_call" | "answer_call" | "reject_call" => Some(Self::Phone),
            "play_music" | "pause_music" | "next_track" => Some(Self::Music),
            "adjust_volume" | "set_temperature" | "open_window" | "close_window" => {
                Some(Self::Vehicle)
            }
            "emergency_call" | "adas_control" => Some(Self::Safety),
            _ => None,
        }
    }

    fn handle(self, task: &Task) -> ResultMap {
        let params = Value::Object(task.params.clone());
        match self {
            Self::Navigation => {
                let destination = param_str(task, "destination").unwrap_or("未指定目的地");
                success(
                    "navigation",
                    &task.action,
                    format!("导航到: {destination}"),
                    params,
                )
            }
            Self::Phone => {
                let contact = param_str(task, "contact").unwrap_or("未知联系人");
                success(
                    "phone",
                    &task.action,
                    format!("电话操作: {} -> {contact}", task.action),
                    params,
                )
            }
            Self::Music => {
                let message = match param_str(task, "query").filter(|q| !q.is_empty()) {
                    Some(query) => format!("音乐操作: {} -> {query}", task.action),
                    None => format!("音乐操作: {}", task.action),
                };
                success("music", &task.action, message, params)
            }
            Self::Vehicle => success(
                "vehicle_setting",
                &task.action,
                format!("车辆设置: {}", task.action),
                params,
            ),
            Self::Safety => {
                let mut result = success(
                    "safety",
                    &task.action,
                    format!("安全操作: {}", task.action),
                    params,
                );
                result.insert("priority".into(), json!("critical"));
                result
            }
        }
    }
}

fn param_str<'a>(task: &'a Task, key: &str) -> Option<&'a str> {
    task.params.get(key).and_then(Value::as_str)
}

fn success(domain: &str, action: &str, message: String, params: Value) -> ResultMap {
    let mut result = ResultMap::new();
    result.insert("status".into(), json!("success"));
    result.insert("domain".into(), json!(domain));
    result.insert("action".into(), json!(action));
    result.insert("message".into(), json!(message));
    result.insert("params".into(), params);
    result
}

/// Result for an action no handler claims.
fn unhandled(task: &Task) -> ResultMap {
    let mut result = ResultMap::new();
    result.insert("status".into(), json!("success"));
    result.insert(
        "message".into(),
        json!(format!("Task '{}' executed (no specific handler)", task.name)),
    );
    result.insert("action".into(), json!(task.action));
    result.insert("params".into(), Value::Object(task.params.clone()));
    result
}

/// Converts intents into tasks and runs their handlers.
#[derive(Clone)]
pub struct TaskExecutor {
    priorities: DomainPriorities,
    task_timeout: Duration,
    overrides: Arc<HashMap<String, Arc<dyn TaskHandler>>>,
}

impl TaskExecutor {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            priorities: config.domain_priorities,
            task_timeout: Duration::from_millis(config.task_timeout_ms),
            overrides: Arc::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&SchedulerConfig::default())
    }

    /// Install `handler` for `action`, replacing any built-in handler.
    pub fn register_handler(&mut self, action: impl Into<String>, handler: impl TaskHandler + 'static) {
        Arc::make_mut(&mut self.overrides).insert(action.into(), Arc::new(handler));
    }

    /// Build a pending task for `intent` with its domain's priority.
    pub fn intent_to_task(&self, intent: &Intent) -> Task {
        Task::new(intent.domain, intent.intent_type.as_str())
            .with_params(intent.slots.clone())
            .with_priority(self.priorities.for_domain(intent.domain))
    }

    /// Run the handler for `task` on the current thread.
    ///
    /// # Errors
    /// `HandlerFailed` when a registered handler reports an error.
    pub fn execute(&self, task: &Task) -> DomainResult<ResultMap> {
        if let Some(handler) = self.overrides.get(&task.action) {
            return handler
                .handle(task)
                .map_err(|reason| DomainError::HandlerFailed {
                    action: task.action.clone(),
                    reason,
                });
        }

        match HandlerKind::for_action(&task.action) {
            Some(kind) => Ok(kind.handle(task)),
            None => {
                debug!(action = %task.action, "no handler registered, using generic result");
                Ok(unhandled(task))
            }
        }
    }

    /// Run the handler on the blocking pool under the task deadline.
    ///
    /// A panicking handler and an expired deadline both come back as errors
    /// so the caller can fail just this task. An expired handler keeps
    /// running on its blocking thread; use [`Self::execute_with_permit`] when
    /// that thread must stay counted against an admission limit.
    pub async fn execute_with_deadline(&self, task: Task) -> DomainResult<ResultMap> {
        self.run_blocking(task, ()).await
    }

    /// Like [`Self::execute_with_deadline`], but `permit` is released only
    /// when the handler itself returns, even after the deadline has expired.
    pub async fn execute_with_permit(
        &self,
        task: Task,
        permit: OwnedSemaphorePermit,
    ) -> DomainResult<ResultMap> {
        self.run_blocking(task, permit).await
    }

    async fn run_blocking<G: Send + 'static>(&self, task: Task, guard: G) -> DomainResult<ResultMap> {
        let task_id = task.id.clone();
        let action = task.action.clone();
        let executor = self.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            executor.execute(&task)
        });

        match timeout(self.task_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                warn!(task_id = %task_id, action = %action, error = %join_err, "task handler panicked");
                Err(DomainError::HandlerFailed {
                    action,
                    reason: "handler panicked".to_string(),
                })
            }
            Err(_) => Err(DomainError::TaskTimeout {
                task_id,
                timeout_ms: u64::try_from(self.task_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

impl Default for TaskExecutor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DomainType, IntentType};

    fn task_for(intent: Intent) -> Task {
        TaskExecutor::with_defaults().intent_to_task(&intent)
    }

    #[test]
    fn test_intent_to_task() {
        let intent = Intent::new(IntentType::NavigateTo, 1.0, "导航到天安门")
            .with_slot("destination", "天安门");
        let task = task_for(intent);

        assert_eq!(task.name, "navigation:navigate_to");
        assert_eq!(task.domain, DomainType::Navigation);
        assert_eq!(task.action, "navigate_to");
        assert_eq!(task.priority, 80);
        assert_eq!(task.params["destination"], "天安门");
    }

    #[test]
    fn test_priority_table_applies_to_every_domain() {
        let executor = TaskExecutor::with_defaults();
        let cases = [
            (IntentType::EmergencyCall, 100),
            (IntentType::NavigateTo, 80),
            (IntentType::MakeCall, 70),
            (IntentType::SetSeat, 60),
            (IntentType::PlayMusic, 50),
            (IntentType::Chat, 30),
        ];
        for (intent_type, priority) in cases {
            let task = executor.intent_to_task(&Intent::new(intent_type, 1.0, ""));
            assert_eq!(task.priority, priority, "{intent_type}");
        }
    }

    #[test]
    fn test_navigation_handler() {
        let executor = TaskExecutor::with_defaults();
        let task = task_for(Intent::new(IntentType::NavigateTo, 1.0, "").with_slot("destination", "天安门"));
        let result = executor.execute(&task).unwrap();
        assert_eq!(result["status"], "success");
        assert_eq!(result["domain"], "navigation");
        assert_eq!(result["message"], "导航到: 天安门");

        let task = task_for(Intent::new(IntentType::SearchPoi, 1.0, ""));
        assert_eq!(executor.execute(&task).unwrap()["message"], "导航到: 未指定目的地");
    }

    #[test]
    fn test_phone_music_vehicle_safety_handlers() {
        let executor = TaskExecutor::with_defaults();

        let call = task_for(Intent::new(IntentType::MakeCall, 1.0, "").with_slot("contact", "妈妈"));
        assert_eq!(executor.execute(&call).unwrap()["message"], "电话操作: make_call -> 妈妈");

        let music = task_for(Intent::new(IntentType::PlayMusic, 1.0, "").with_slot("query", "晴天"));
        assert_eq!(executor.execute(&music).unwrap()["message"], "音乐操作: play_music -> 晴天");

        let pause = task_for(Intent::new(IntentType::PauseMusic, 1.0, ""));
        assert_eq!(executor.execute(&pause).unwrap()["message"], "音乐操作: pause_music");

        let window = task_for(Intent::new(IntentType::OpenWindow, 1.0, ""));
        assert_eq!(executor.execute(&window).unwrap()["domain"], "vehicle_setting");

        let sos = task_for(Intent::new(IntentType::EmergencyCall, 1.0, ""));
        let result = executor.execute(&sos).unwrap();
        assert_eq!(result["priority"], "critical");
        assert_eq!(result["message"], "安全操作: emergency_call");
    }

    #[test]
    fn test_unhandled_action_uses_generic_result() {
        let executor = TaskExecutor::with_defaults();
        let task = task_for(Intent::new(IntentType::SetLight, 1.0, ""));
        let result = executor.execute(&task).unwrap();
        assert_eq!(result["status"], "success");
        assert_eq!(
            result["message"],
            "Task 'vehicle_setting:set_light' executed (no specific handler)"
        );
        assert!(result.get("domain").is_none());
    }

    #[test]
    fn test_registered_handler_overrides_builtin() {
        let mut executor = TaskExecutor::with_defaults();
        executor.register_handler("navigate_to", |task: &Task| -> HandlerResult {
            let mut result = ResultMap::new();
            result.insert("status".into(), json!("success"));
            result.insert("message".into(), json!(format!("custom {}", task.action)));
            Ok(result)
        });
        executor.register_handler("make_call", |_: &Task| -> HandlerResult {
            Err("no signal".to_string())
        });

        let nav = task_for(Intent::new(IntentType::NavigateTo, 1.0, ""));
        assert_eq!(executor.execute(&nav).unwrap()["message"], "custom navigate_to");

        let call = task_for(Intent::new(IntentType::MakeCall, 1.0, ""));
        let err = executor.execute(&call).unwrap_err();
        assert!(err.to_string().contains("no signal"));
    }

    #[tokio::test]
    async fn test_deadline_expires() {
        let config = SchedulerConfig {
            task_timeout_ms: 20,
            ..Default::default()
        };
        let mut executor = TaskExecutor::new(&config);
        executor.register_handler("set_seat", |_: &Task| -> HandlerResult {
            std::thread::sleep(std::time::Duration::from_millis(300));
            Ok(ResultMap::new())
        });

        let task = executor.intent_to_task(&Intent::new(IntentType::SetSeat, 1.0, ""));
        let err = executor.execute_with_deadline(task).await.unwrap_err();
        assert!(matches!(err, DomainError::TaskTimeout { timeout_ms: 20, .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_expired_handler_keeps_its_permit() {
        let config = SchedulerConfig {
            task_timeout_ms: 20,
            ..Default::default()
        };
        let mut executor = TaskExecutor::new(&config);
        executor.register_handler("set_seat", |_: &Task| -> HandlerResult {
            std::thread::sleep(std::time::Duration::from_millis(200));
            Ok(ResultMap::new())
        });

        let permits = Arc::new(tokio::sync::Semaphore::new(1));
        let permit = permits.clone().acquire_owned().await.unwrap();
        let task = executor.intent_to_task(&Intent::new(IntentType::SetSeat, 1.0, ""));
        let err = executor.execute_with_permit(task, permit).await.unwrap_err();

        assert!(matches!(err, DomainError::TaskTimeout { .. }));
        assert_eq!(permits.available_permits(), 0);

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        assert_eq!(permits.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let mut executor = TaskExecutor::with_defaults();
        executor.register_handler("close_window", |_: &Task| -> HandlerResult {
            panic!("window motor jammed")
        });

        let task = executor.intent_to_task(&Intent::new(IntentType::CloseWindow, 1.0, ""));
        let err = executor.execute_with_deadline(task).await.unwrap_err();
        assert!(matches!(err, DomainError::HandlerFailed { .. }));
    }
}
