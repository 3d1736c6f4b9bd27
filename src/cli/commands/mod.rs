//! CLI command implementations.

pub mod ask;
pub mod check;
pub mod classify;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::adapters::llm::OpenAiCompatClient;
use crate::domain::models::Config;
use crate::domain::ports::LlmClient;
use crate::infrastructure::config::ConfigLoader;

/// Load configuration from `path`, or the project hierarchy when unset.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    config.context("Failed to load configuration")
}

/// Build the LLM client when enabled; a missing key downgrades to rule-based.
pub fn build_llm(config: &Config) -> Option<Arc<dyn LlmClient>> {
    if !config.llm.enabled {
        return None;
    }
    match OpenAiCompatClient::from_config(&config.llm) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "LLM enabled but unavailable, running rule-based");
            None
        }
    }
}
