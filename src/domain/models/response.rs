//! Request context and response types shared by every agent.

use serde::{Deserialize, Serialize};

use super::conversation::MemoryContext;
use super::intent::{DrivingState, Intent, IntentType, Slots};
use super::task::ResultMap;

/// Free-form response metadata.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Marker prefixed to responses that need explicit driver acknowledgement.
pub const CONFIRMATION_MARKER: &str = "[需要确认]";

/// Substring the safety gate writes into confirmation notices.
pub const CONFIRMATION_NOTICE: &str = "需要确认";

fn default_intent_confidence() -> f64 {
    0.5
}

/// Loosely-typed intent as produced by classifiers and LLM replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    #[serde(rename = "type", default)]
    pub intent_type: String,
    #[serde(default = "default_intent_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub slots: Slots,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl IntentResult {
    /// Rebuild a typed intent; unrecognized type names become `Unknown`.
    pub fn to_intent(&self, raw_text: &str) -> Intent {
        let intent_type = IntentType::from_str_lossy(&self.intent_type);
        Intent::new(intent_type, self.confidence, raw_text).with_slots(self.slots.clone())
    }
}

impl From<&Intent> for IntentResult {
    fn from(intent: &Intent) -> Self {
        Self {
            intent_type: intent.intent_type.as_str().to_string(),
            confidence: intent.confidence,
            slots: intent.slots.clone(),
            domain: Some(intent.domain.as_str().to_string()),
        }
    }
}

/// Everything an agent needs to handle one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentContext {
    #[serde(flatten)]
    pub memory: MemoryContext,
    pub driving_state: DrivingState,
    #[serde(default)]
    pub intent_results: Vec<IntentResult>,
}

impl AgentContext {
    pub fn new(memory: MemoryContext, driving_state: DrivingState) -> Self {
        Self {
            memory,
            driving_state,
            intent_results: Vec::new(),
        }
    }

    pub fn with_intent_results(mut self, intent_results: Vec<IntentResult>) -> Self {
        self.intent_results = intent_results;
        self
    }
}

/// The unit returned at every level of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    /// Intents proposed by a reasoning agent, consumed by the dispatcher
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intent_results: Vec<IntentResult>,
    pub task_results: Vec<ResultMap>,
    pub requires_confirmation: bool,
    /// In `[0.0, 1.0]`
    pub confidence: f64,
    pub metadata: Metadata,
}

impl AgentResponse {
    pub fn new(content: impl Into<String>, confidence: f64) -> Self {
        Self {
            content: content.into(),
            confidence: confidence.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Flag the response for confirmation and prefix the marker once.
    pub fn mark_requires_confirmation(&mut self) {
        self.requires_confirmation = true;
        if !self.content.starts_with(CONFIRMATION_MARKER) {
            self.content = format!("{} {}", CONFIRMATION_MARKER, self.content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_result_defaults_from_json() {
        let parsed: IntentResult =
            serde_json::from_str(r#"{"type": "play_music", "slots": {"query": "晴天"}}"#).unwrap();
        assert_eq!(parsed.intent_type, "play_music");
        assert!((parsed.confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(parsed.slots["query"], "晴天");
    }

    #[test]
    fn test_unrecognized_type_becomes_unknown() {
        let result = IntentResult {
            intent_type: "levitate".to_string(),
            confidence: 0.9,
            slots: Slots::new(),
            domain: None,
        };
        let intent = result.to_intent("飞起来");
        assert_eq!(intent.intent_type, IntentType::Unknown);
        assert_eq!(intent.raw_text, "飞起来");
    }

    #[test]
    fn test_confirmation_marker_is_not_doubled() {
        let mut response = AgentResponse::new("紧急呼叫", 1.0);
        response.mark_requires_confirmation();
        response.mark_requires_confirmation();
        assert!(response.requires_confirmation);
        assert_eq!(response.content, "[需要确认] 紧急呼叫");
    }
}
