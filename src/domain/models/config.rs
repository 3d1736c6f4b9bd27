use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::intent::DomainType;

/// Main configuration structure for the cockpit agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Minimum classifier confidence for the fast path (0.0-1.0)
    #[serde(default = "default_fast_path_threshold")]
    pub fast_path_threshold: f64,

    /// Keyword classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Driving-state safety rules
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Task scheduling and execution limits
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Conversation memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// LLM fallback configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

const fn default_fast_path_threshold() -> f64 {
    0.6
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fast_path_threshold: default_fast_path_threshold(),
            classifier: ClassifierConfig::default(),
            safety: SafetyConfig::default(),
            scheduler: SchedulerConfig::default(),
            memory: MemoryConfig::default(),
            llm: LlmConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Keyword classifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassifierConfig {
    /// Keyword results at or below this confidence go to the LLM fallback
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

const fn default_confidence_threshold() -> f64 {
    0.5
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// Driving-state safety rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SafetyConfig {
    /// Actions refused outright while driving or on the highway
    #[serde(default = "default_blocked_while_driving")]
    pub blocked_while_driving: Vec<String>,

    /// Actions that pass but need driver confirmation
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: Vec<String>,
}

fn default_blocked_while_driving() -> Vec<String> {
    vec!["watch_video".to_string(), "browse_web".to_string()]
}

fn default_require_confirmation() -> Vec<String> {
    vec!["open_window_highway".to_string(), "send_message".to_string()]
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            blocked_while_driving: default_blocked_while_driving(),
            require_confirmation: default_require_confirmation(),
        }
    }
}

/// Task scheduling and execution limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Maximum number of tasks running at once (1-64)
    #[serde(default = "default_max_parallel_tasks")]
    pub max_parallel_tasks: usize,

    /// Domains in which a newer task cancels every older live task
    #[serde(default = "default_exclusivity_domains")]
    pub exclusivity_domains: Vec<DomainType>,

    /// Per-task handler deadline in milliseconds
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,

    /// Priority assigned to tasks by domain
    #[serde(default)]
    pub domain_priorities: DomainPriorities,
}

const fn default_max_parallel_tasks() -> usize {
    5
}

fn default_exclusivity_domains() -> Vec<DomainType> {
    vec![DomainType::Navigation, DomainType::Music]
}

const fn default_task_timeout_ms() -> u64 {
    5000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel_tasks: default_max_parallel_tasks(),
            exclusivity_domains: default_exclusivity_domains(),
            task_timeout_ms: default_task_timeout_ms(),
            domain_priorities: DomainPriorities::default(),
        }
    }
}

/// Per-domain task priority table. Higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct DomainPriorities {
    pub safety: i32,
    pub navigation: i32,
    pub phone: i32,
    pub vehicle_setting: i32,
    pub music: i32,
    pub general: i32,
}

impl Default for DomainPriorities {
    fn default() -> Self {
        Self {
            safety: 100,
            navigation: 80,
            phone: 70,
            vehicle_setting: 60,
            music: 50,
            general: 30,
        }
    }
}

impl DomainPriorities {
    pub const fn for_domain(&self, domain: DomainType) -> i32 {
        match domain {
            DomainType::Safety => self.safety,
            DomainType::Navigation => self.navigation,
            DomainType::Phone => self.phone,
            DomainType::VehicleSetting => self.vehicle_setting,
            DomainType::Music => self.music,
            DomainType::General => self.general,
        }
    }
}

/// Conversation memory configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemoryConfig {
    /// Messages kept verbatim before older turns are folded into the summary
    #[serde(default = "default_max_recent_messages")]
    pub max_recent_messages: usize,
}

const fn default_max_recent_messages() -> usize {
    20
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_recent_messages: default_max_recent_messages(),
        }
    }
}

/// LLM fallback configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// Whether the classifier and dispatcher may call the LLM at all
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Falls back to `OPENAI_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on transient errors (0-10)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    1024
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!((config.fast_path_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.scheduler.max_parallel_tasks, 5);
        assert_eq!(
            config.scheduler.exclusivity_domains,
            vec![DomainType::Navigation, DomainType::Music]
        );
        assert!(config.safety.blocked_while_driving.contains(&"watch_video".to_string()));
        assert!(!config.llm.enabled);
    }

    #[test]
    fn test_domain_priority_table() {
        let priorities = DomainPriorities::default();
        assert_eq!(priorities.for_domain(DomainType::Safety), 100);
        assert_eq!(priorities.for_domain(DomainType::Navigation), 80);
        assert_eq!(priorities.for_domain(DomainType::Phone), 70);
        assert_eq!(priorities.for_domain(DomainType::VehicleSetting), 60);
        assert_eq!(priorities.for_domain(DomainType::Music), 50);
        assert_eq!(priorities.for_domain(DomainType::General), 30);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r"
scheduler:
  max_parallel_tasks: 2
  domain_priorities:
    music: 90
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.scheduler.max_parallel_tasks, 2);
        assert_eq!(config.scheduler.task_timeout_ms, 5000);
        assert_eq!(config.scheduler.domain_priorities.music, 90);
        assert_eq!(config.scheduler.domain_priorities.safety, 100);
        assert_eq!(config.memory.max_recent_messages, 20);
    }
}
