//! Orchestration services.
//!
//! Leaves first: the classifier, safety gate and task graph have no
//! dependencies on each other; the scheduler wraps the graph; the
//! plan-execute and reasoning agents build on those; the dispatcher wires
//! everything together per request.

pub mod dispatcher;
pub mod intent_classifier;
pub mod plan_execute;
pub mod reasoning_agent;
pub mod safety_gate;
pub mod task_executor;
pub mod task_graph;
pub mod task_scheduler;

pub use dispatcher::Dispatcher;
pub use intent_classifier::IntentClassifier;
pub use plan_execute::{CancelledTask, PlanExecuteAgent};
pub use reasoning_agent::ReasoningAgent;
pub use safety_gate::SafetyGate;
pub use task_executor::{HandlerKind, HandlerResult, TaskExecutor, TaskHandler};
pub use task_graph::TaskGraph;
pub use task_scheduler::{SchedulerStatus, SupersededTask, TaskScheduler};
