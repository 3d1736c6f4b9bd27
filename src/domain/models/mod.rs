pub mod config;
pub mod conversation;
pub mod intent;
pub mod response;
pub mod safety;
pub mod task;

pub use config::{
    ClassifierConfig, Config, DomainPriorities, LlmConfig, LoggingConfig, MemoryConfig,
    SafetyConfig, SchedulerConfig,
};
pub use conversation::{ChatMessage, MemoryContext, Preference, Role};
pub use intent::{DomainType, DrivingState, Intent, IntentType, Slots};
pub use response::{
    AgentContext, AgentResponse, IntentResult, Metadata, CONFIRMATION_MARKER, CONFIRMATION_NOTICE,
};
pub use safety::SafetyVerdict;
pub use task::{ResultMap, Task, TaskStatus, DEFAULT_TASK_PRIORITY};
