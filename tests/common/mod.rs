//! Shared helpers for integration tests.

#![allow(dead_code)]

use cockpit_agent::domain::models::{IntentResult, ResultMap};

/// High-confidence intent result with the given slots.
pub fn intent(intent_type: &str, slots: serde_json::Value) -> IntentResult {
    IntentResult {
        intent_type: intent_type.to_string(),
        confidence: 0.9,
        slots: slots.as_object().cloned().unwrap_or_default(),
        domain: None,
    }
}

/// String field of a task result, empty when absent.
pub fn field<'a>(result: &'a ResultMap, key: &str) -> &'a str {
    result
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
}
