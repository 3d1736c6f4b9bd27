use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{base_table, header, output, CommandOutput};
use crate::domain::models::{Config, Intent, Slots};
use crate::services::IntentClassifier;

use super::build_llm;

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Utterance to classify
    pub utterance: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifyOutput {
    pub intent: String,
    pub domain: String,
    pub confidence: f64,
    pub slots: Slots,
}

impl From<Intent> for ClassifyOutput {
    fn from(intent: Intent) -> Self {
        Self {
            intent: intent.intent_type.as_str().to_string(),
            domain: intent.domain.as_str().to_string(),
            confidence: intent.confidence,
            slots: intent.slots,
        }
    }
}

impl CommandOutput for ClassifyOutput {
    fn to_human(&self) -> String {
        let mut table = base_table();
        table.set_header(header(&["Intent", "Domain", "Confidence", "Slots"]));
        table.add_row(vec![
            self.intent.clone(),
            self.domain.clone(),
            format!("{:.2}", self.confidence),
            serde_json::Value::Object(self.slots.clone()).to_string(),
        ]);
        table.to_string()
    }
}

pub async fn execute(args: ClassifyArgs, config: &Config, json: bool) -> Result<()> {
    let mut classifier = IntentClassifier::new(config.classifier.clone());
    if let Some(llm) = build_llm(config) {
        classifier = classifier.with_llm(llm);
    }

    let intent = classifier.classify(&args.utterance).await;
    output(&ClassifyOutput::from(intent), json);
    Ok(())
}
