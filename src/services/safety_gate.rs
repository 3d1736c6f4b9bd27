//! Driving-state safety rules.
//!
//! Pure evaluation of an intent against two configured action sets: actions
//! refused while the vehicle moves, and actions that need the driver's
//! confirmation. Safety-domain intents always pass.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::domain::models::{DomainType, DrivingState, Intent, IntentType, SafetyConfig, SafetyVerdict};

/// Confirmation key used for opening a window at highway speed.
pub const OPEN_WINDOW_HIGHWAY: &str = "open_window_highway";

pub const EMERGENCY_CALL_WARNING: &str = "紧急呼叫将立即执行";
pub const HIGHWAY_NAVIGATION_WARNING: &str = "高速行驶中，建议使用语音交互完成导航设置";

/// Checks intents against the driving-state rules.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    blocked_while_driving: HashSet<String>,
    require_confirmation: HashSet<String>,
}

impl SafetyGate {
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            blocked_while_driving: config.blocked_while_driving.iter().cloned().collect(),
            require_confirmation: config.require_confirmation.iter().cloned().collect(),
        }
    }

    /// Gate with the default blocked and confirmation lists.
    pub fn with_defaults() -> Self {
        Self::new(&SafetyConfig::default())
    }

    /// Evaluate `intent` for the given driving state.
    pub fn check(&self, intent: &Intent, driving_state: DrivingState) -> SafetyVerdict {
        if intent.domain == DomainType::Safety {
            if intent.intent_type == IntentType::EmergencyCall {
                info!("Safety pass: emergency_call (requires confirmation)");
                return SafetyVerdict::needs_confirmation(EMERGENCY_CALL_WARNING);
            }
            info!(action = intent.intent_type.as_str(), "Safety pass: safety domain");
            return SafetyVerdict::allowed();
        }

        if !driving_state.is_moving() {
            return SafetyVerdict::allowed();
        }

        let action = intent.intent_type.as_str();
        if self.blocked_while_driving.contains(action) {
            warn!(action, %driving_state, "Safety BLOCKED");
            return SafetyVerdict::blocked(blocked_reason(action));
        }

        let confirmation_key =
            if driving_state == DrivingState::Highway && intent.intent_type == IntentType::OpenWindow {
                OPEN_WINDOW_HIGHWAY
            } else {
                action
            };
        if self.require_confirmation.contains(confirmation_key) {
            info!(action, %driving_state, "Safety confirmation required");
            return SafetyVerdict::needs_confirmation(confirmation_notice(action));
        }

        let verdict = SafetyVerdict::allowed();
        if intent.domain == DomainType::Navigation && driving_state == DrivingState::Highway {
            return verdict.with_warning(HIGHWAY_NAVIGATION_WARNING);
        }
        verdict
    }

    pub fn is_blocked_while_driving(&self, action: &str) -> bool {
        self.blocked_while_driving.contains(action)
    }
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Reason recorded when a moving vehicle refuses `action`.
pub fn blocked_reason(action: &str) -> String {
    format!("操作 '{action}' 在行驶中被禁止")
}

/// Warning recorded when `action` needs the driver's confirmation.
pub fn confirmation_notice(action: &str) -> String {
    format!("操作 '{action}' 需要确认")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CONFIRMATION_NOTICE;

    const ALL_STATES: [DrivingState; 3] =
        [DrivingState::Parked, DrivingState::Driving, DrivingState::Highway];

    fn intent(intent_type: IntentType) -> Intent {
        Intent::new(intent_type, 0.9, "test")
    }

    #[test]
    fn test_safety_domain_always_passes() {
        let gate = SafetyGate::with_defaults();
        for state in ALL_STATES {
            for it in [IntentType::AdasControl, IntentType::FatigueAlert] {
                let verdict = gate.check(&intent(it), state);
                assert!(verdict.is_safe);
                assert!(!verdict.requires_confirmation);
            }
        }
    }

    #[test]
    fn test_emergency_call_needs_confirmation() {
        let gate = SafetyGate::with_defaults();
        for state in ALL_STATES {
            let verdict = gate.check(&intent(IntentType::EmergencyCall), state);
            assert!(verdict.is_safe);
            assert!(verdict.requires_confirmation);
            assert_eq!(verdict.warnings, vec![EMERGENCY_CALL_WARNING.to_string()]);
        }
    }

    #[test]
    fn test_blocked_while_moving() {
        let gate = SafetyGate::with_defaults();
        for state in [DrivingState::Driving, DrivingState::Highway] {
            let verdict = gate.check(&intent(IntentType::WatchVideo), state);
            assert!(!verdict.is_safe);
            assert!(verdict.blocked_reason.contains("watch_video"));
        }
    }

    #[test]
    fn test_blocked_action_allowed_when_parked() {
        let gate = SafetyGate::with_defaults();
        let verdict = gate.check(&intent(IntentType::WatchVideo), DrivingState::Parked);
        assert!(verdict.is_safe);
        assert!(verdict.blocked_reason.is_empty());
    }

    #[test]
    fn test_open_window_only_confirmed_on_highway() {
        let gate = SafetyGate::with_defaults();

        let driving = gate.check(&intent(IntentType::OpenWindow), DrivingState::Driving);
        assert!(driving.is_safe);
        assert!(!driving.requires_confirmation);

        let highway = gate.check(&intent(IntentType::OpenWindow), DrivingState::Highway);
        assert!(highway.is_safe);
        assert!(highway.requires_confirmation);
        assert!(highway.warnings[0].contains("open_window"));
        assert!(highway.warnings[0].contains(CONFIRMATION_NOTICE));
    }

    #[test]
    fn test_send_message_confirmed_while_driving() {
        let gate = SafetyGate::with_defaults();
        let verdict = gate.check(&intent(IntentType::SendMessage), DrivingState::Driving);
        assert!(verdict.requires_confirmation);

        let parked = gate.check(&intent(IntentType::SendMessage), DrivingState::Parked);
        assert!(!parked.requires_confirmation);
    }

    #[test]
    fn test_highway_navigation_warning() {
        let gate = SafetyGate::with_defaults();
        let verdict = gate.check(&intent(IntentType::NavigateTo), DrivingState::Highway);
        assert!(verdict.is_safe);
        assert!(!verdict.requires_confirmation);
        assert_eq!(verdict.warnings, vec![HIGHWAY_NAVIGATION_WARNING.to_string()]);

        let driving = gate.check(&intent(IntentType::NavigateTo), DrivingState::Driving);
        assert!(driving.warnings.is_empty());
    }

    #[test]
    fn test_custom_lists() {
        let gate = SafetyGate::new(&SafetyConfig {
            blocked_while_driving: vec!["send_message".to_string()],
            require_confirmation: vec!["play_music".to_string()],
        });
        assert!(!gate.check(&intent(IntentType::SendMessage), DrivingState::Driving).is_safe);
        assert!(gate.check(&intent(IntentType::PlayMusic), DrivingState::Highway).requires_confirmation);
        assert!(gate.check(&intent(IntentType::WatchVideo), DrivingState::Driving).is_safe);
    }
}
