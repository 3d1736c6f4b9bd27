//! Safety verdict produced by the safety gate.

use serde::{Deserialize, Serialize};

/// Outcome of checking one intent against the driving-state rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    pub requires_confirmation: bool,
    /// Empty unless `is_safe` is false
    pub blocked_reason: String,
    pub warnings: Vec<String>,
}

impl SafetyVerdict {
    /// Allowed with no flags.
    pub fn allowed() -> Self {
        Self {
            is_safe: true,
            ..Default::default()
        }
    }

    /// Allowed, but the caller must ask the driver to confirm.
    pub fn needs_confirmation(warning: impl Into<String>) -> Self {
        Self {
            is_safe: true,
            requires_confirmation: true,
            warnings: vec![warning.into()],
            ..Default::default()
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            is_safe: false,
            blocked_reason: reason.into(),
            ..Default::default()
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}
