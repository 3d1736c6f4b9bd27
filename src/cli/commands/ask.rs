use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::adapters::memory::InMemoryConversation;
use crate::cli::output::{format_task_results, output, CommandOutput};
use crate::cli::parse_driving_state;
use crate::domain::models::{AgentResponse, Config, DrivingState};
use crate::services::Dispatcher;

use super::build_llm;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// What the driver said
    pub utterance: String,

    /// Vehicle state: parked, driving or highway
    #[arg(short, long, default_value = "parked", value_parser = parse_driving_state)]
    pub driving_state: DrivingState,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct AskOutput(pub AgentResponse);

impl CommandOutput for AskOutput {
    fn to_human(&self) -> String {
        let response = &self.0;
        let mut lines = vec![response.content.clone()];

        if !response.task_results.is_empty() {
            lines.push(format_task_results(&response.task_results));
        }

        let path = response
            .metadata
            .get("path")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("-");
        lines.push(format!(
            "path: {path}  confidence: {:.2}{}",
            response.confidence,
            if response.requires_confirmation {
                "  (confirmation required)"
            } else {
                ""
            }
        ));
        lines.join("\n")
    }
}

pub async fn execute(args: AskArgs, config: &Config, json: bool) -> Result<()> {
    let memory = Arc::new(InMemoryConversation::new(config.memory.clone()));
    let dispatcher = Dispatcher::new(config, memory, build_llm(config));

    let response = dispatcher.process(&args.utterance, args.driving_state).await;
    output(&AskOutput(response), json);
    Ok(())
}
