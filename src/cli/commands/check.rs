use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{base_table, header, output, CommandOutput};
use crate::cli::parse_driving_state;
use crate::domain::models::{Config, DrivingState, SafetyVerdict};
use crate::services::{IntentClassifier, SafetyGate};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Utterance to check
    pub utterance: String,

    /// Vehicle state: parked, driving or highway
    #[arg(short, long, default_value = "parked", value_parser = parse_driving_state)]
    pub driving_state: DrivingState,
}

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub intent: String,
    pub driving_state: DrivingState,
    #[serde(flatten)]
    pub verdict: SafetyVerdict,
}

impl CommandOutput for CheckOutput {
    fn to_human(&self) -> String {
        let verdict = if !self.verdict.is_safe {
            "blocked"
        } else if self.verdict.requires_confirmation {
            "needs confirmation"
        } else {
            "allowed"
        };
        let notes = if self.verdict.is_safe {
            self.verdict.warnings.join("; ")
        } else {
            self.verdict.blocked_reason.clone()
        };

        let mut table = base_table();
        table.set_header(header(&["Intent", "Driving State", "Verdict", "Notes"]));
        table.add_row(vec![
            self.intent.clone(),
            self.driving_state.to_string(),
            verdict.to_string(),
            notes,
        ]);
        table.to_string()
    }
}

pub async fn execute(args: CheckArgs, config: &Config, json: bool) -> Result<()> {
    // Keyword-only: the verdict must not depend on a remote service
    let intent = IntentClassifier::new(config.classifier.clone()).classify_by_keywords(&args.utterance);
    let verdict = SafetyGate::new(&config.safety).check(&intent, args.driving_state);

    output(
        &CheckOutput {
            intent: intent.intent_type.as_str().to_string(),
            driving_state: args.driving_state,
            verdict,
        },
        json,
    );
    Ok(())
}
