use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Directory holding the project configuration files.
pub const CONFIG_DIR: &str = ".cockpit";

/// Prefix of environment overrides; nested keys use `__`.
pub const ENV_PREFIX: &str = "COCKPIT_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {name}: {value}. Must be between 0.0 and 1.0")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Invalid max_parallel_tasks: {0}. Must be between 1 and 64")]
    InvalidMaxParallelTasks(usize),

    #[error("Invalid task_timeout_ms: {0}. Must be positive")]
    InvalidTaskTimeout(u64),

    #[error("Invalid max_recent_messages: {0}. Must be at least 1")]
    InvalidMaxRecentMessages(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid LLM temperature: {0}. Must be between 0.0 and 2.0")]
    InvalidTemperature(f32),

    #[error("Invalid LLM max_retries: {0}. Must be at most 10")]
    InvalidMaxRetries(u32),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .cockpit/config.yaml
    /// 3. .cockpit/local.yaml (optional developer overrides)
    /// 4. Environment variables (COCKPIT_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same as [`ConfigLoader::load`] with the files read from `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file; environment overrides still apply
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        check_unit_interval("fast_path_threshold", config.fast_path_threshold)?;
        check_unit_interval(
            "classifier.confidence_threshold",
            config.classifier.confidence_threshold,
        )?;

        let scheduler = &config.scheduler;
        if scheduler.max_parallel_tasks == 0 || scheduler.max_parallel_tasks > 64 {
            return Err(ConfigError::InvalidMaxParallelTasks(
                scheduler.max_parallel_tasks,
            ));
        }
        if scheduler.task_timeout_ms == 0 {
            return Err(ConfigError::InvalidTaskTimeout(scheduler.task_timeout_ms));
        }

        if config.memory.max_recent_messages == 0 {
            return Err(ConfigError::InvalidMaxRecentMessages(
                config.memory.max_recent_messages,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        let llm = &config.llm;
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::InvalidTemperature(llm.temperature));
        }
        if llm.max_retries > 10 {
            return Err(ConfigError::InvalidMaxRetries(llm.max_retries));
        }
        if llm.enabled && llm.api_base.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "llm.api_base cannot be empty when the LLM is enabled".to_string(),
            ));
        }

        for action in config
            .safety
            .blocked_while_driving
            .iter()
            .chain(&config.safety.require_confirmation)
        {
            if action.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "safety action names cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn check_unit_interval(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}
