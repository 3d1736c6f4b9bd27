//! Intent domain model.
//!
//! Intents are the classified meaning of one utterance. Each intent type
//! belongs to exactly one cockpit domain; the mapping is a closed `match`
//! so adding an intent without a domain fails to compile.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Slot values extracted from an utterance (destination, contact, level...).
pub type Slots = serde_json::Map<String, serde_json::Value>;

/// Functional domain of the cockpit an intent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainType {
    Navigation,
    Phone,
    Music,
    VehicleSetting,
    Safety,
    General,
}

impl DomainType {
    /// Every domain, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Navigation,
        Self::Phone,
        Self::Music,
        Self::VehicleSetting,
        Self::Safety,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Phone => "phone",
            Self::Music => "music",
            Self::VehicleSetting => "vehicle_setting",
            Self::Safety => "safety",
            Self::General => "general",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "navigation" => Some(Self::Navigation),
            "phone" => Some(Self::Phone),
            "music" => Some(Self::Music),
            "vehicle_setting" => Some(Self::VehicleSetting),
            "safety" => Some(Self::Safety),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intent types recognized across all domains.
///
/// Declaration order matters: the keyword classifier breaks score ties in
/// favour of the intent declared first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    // Navigation
    NavigateTo,
    SearchPoi,
    CancelNavigation,
    // Phone
    MakeCall,
    AnswerCall,
    RejectCall,
    SendMessage,
    // Music
    PlayMusic,
    PauseMusic,
    NextTrack,
    AdjustVolume,
    // Vehicle settings
    SetTemperature,
    OpenWindow,
    CloseWindow,
    SetSeat,
    SetLight,
    // Safety
    EmergencyCall,
    AdasControl,
    FatigueAlert,
    // General
    WatchVideo,
    BrowseWeb,
    Query,
    Chat,
    Unknown,
}

impl IntentType {
    /// Every intent type, in declaration order.
    pub const ALL: [Self; 24] = [
        Self::NavigateTo,
        Self::SearchPoi,
        Self::CancelNavigation,
        Self::MakeCall,
        Self::AnswerCall,
        Self::RejectCall,
        Self::SendMessage,
        Self::PlayMusic,
        Self::PauseMusic,
        Self::NextTrack,
        Self::AdjustVolume,
        Self::SetTemperature,
        Self::OpenWindow,
        Self::CloseWindow,
        Self::SetSeat,
        Self::SetLight,
        Self::EmergencyCall,
        Self::AdasControl,
        Self::FatigueAlert,
        Self::WatchVideo,
        Self::BrowseWeb,
        Self::Query,
        Self::Chat,
        Self::Unknown,
    ];

    /// Action name used by the safety rules and the handler registry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NavigateTo => "navigate_to",
            Self::SearchPoi => "search_poi",
            Self::CancelNavigation => "cancel_navigation",
            Self::MakeCall => "make_call",
            Self::AnswerCall => "answer_call",
            Self::RejectCall => "reject_call",
            Self::SendMessage => "send_message",
            Self::PlayMusic => "play_music",
            Self::PauseMusic => "pause_music",
            Self::NextTrack => "next_track",
            Self::AdjustVolume => "adjust_volume",
            Self::SetTemperature => "set_temperature",
            Self::OpenWindow => "open_window",
            Self::CloseWindow => "close_window",
            Self::SetSeat => "set_seat",
            Self::SetLight => "set_light",
            Self::EmergencyCall => "emergency_call",
            Self::AdasControl => "adas_control",
            Self::FatigueAlert => "fatigue_alert",
            Self::WatchVideo => "watch_video",
            Self::BrowseWeb => "browse_web",
            Self::Query => "query",
            Self::Chat => "chat",
            Self::Unknown => "unknown",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let lowered = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|it| it.as_str() == lowered)
    }

    /// Parse an action name, falling back to `Unknown` for anything unrecognized.
    pub fn from_str_lossy(s: &str) -> Self {
        Self::from_str(s).unwrap_or(Self::Unknown)
    }

    /// Domain this intent belongs to.
    pub const fn domain(&self) -> DomainType {
        match self {
            Self::NavigateTo | Self::SearchPoi | Self::CancelNavigation => DomainType::Navigation,
            Self::MakeCall | Self::AnswerCall | Self::RejectCall | Self::SendMessage => {
                DomainType::Phone
            }
            Self::PlayMusic | Self::PauseMusic | Self::NextTrack | Self::AdjustVolume => {
                DomainType::Music
            }
            Self::SetTemperature
            | Self::OpenWindow
            | Self::CloseWindow
            | Self::SetSeat
            | Self::SetLight => DomainType::VehicleSetting,
            Self::EmergencyCall | Self::AdasControl | Self::FatigueAlert => DomainType::Safety,
            Self::WatchVideo | Self::BrowseWeb | Self::Query | Self::Chat | Self::Unknown => {
                DomainType::General
            }
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current driving state of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivingState {
    #[default]
    Parked,
    Driving,
    Highway,
}

impl DrivingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parked => "parked",
            Self::Driving => "driving",
            Self::Highway => "highway",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "parked" => Some(Self::Parked),
            "driving" => Some(Self::Driving),
            "highway" => Some(Self::Highway),
            _ => None,
        }
    }

    /// Whether the vehicle is moving.
    pub fn is_moving(&self) -> bool {
        matches!(self, Self::Driving | Self::Highway)
    }
}

impl fmt::Display for DrivingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified user intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub intent_type: IntentType,
    pub domain: DomainType,
    /// Classification confidence in `[0.0, 1.0]`
    pub confidence: f64,
    pub slots: Slots,
    pub raw_text: String,
}

impl Intent {
    /// Create an intent; the domain is derived from the intent type.
    pub fn new(intent_type: IntentType, confidence: f64, raw_text: impl Into<String>) -> Self {
        Self {
            intent_type,
            domain: intent_type.domain(),
            confidence: confidence.clamp(0.0, 1.0),
            slots: Slots::new(),
            raw_text: raw_text.into(),
        }
    }

    /// The zero-confidence `Unknown` intent.
    pub fn unknown(raw_text: impl Into<String>) -> Self {
        Self::new(IntentType::Unknown, 0.0, raw_text)
    }

    pub fn with_slots(mut self, slots: Slots) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_slot(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.slots.insert(key.into(), value.into());
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.intent_type == IntentType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_intent_round_trips_through_action_name() {
        for intent in IntentType::ALL {
            assert_eq!(IntentType::from_str(intent.as_str()), Some(intent));
        }
    }

    #[test]
    fn test_domain_map() {
        assert_eq!(IntentType::NavigateTo.domain(), DomainType::Navigation);
        assert_eq!(IntentType::SendMessage.domain(), DomainType::Phone);
        assert_eq!(IntentType::AdjustVolume.domain(), DomainType::Music);
        assert_eq!(IntentType::OpenWindow.domain(), DomainType::VehicleSetting);
        assert_eq!(IntentType::EmergencyCall.domain(), DomainType::Safety);
        assert_eq!(IntentType::WatchVideo.domain(), DomainType::General);
        assert_eq!(IntentType::Unknown.domain(), DomainType::General);
    }

    #[test]
    fn test_lossy_parse_falls_back_to_unknown() {
        assert_eq!(IntentType::from_str_lossy("teleport"), IntentType::Unknown);
        assert_eq!(IntentType::from_str_lossy(" Play_Music "), IntentType::PlayMusic);
    }

    #[test]
    fn test_intent_derives_domain_and_clamps_confidence() {
        let intent = Intent::new(IntentType::FatigueAlert, 1.7, "困了");
        assert_eq!(intent.domain, DomainType::Safety);
        assert!((intent.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_driving_state_parse() {
        assert_eq!(DrivingState::from_str("HIGHWAY"), Some(DrivingState::Highway));
        assert_eq!(DrivingState::from_str("flying"), None);
        assert!(!DrivingState::Parked.is_moving());
        assert!(DrivingState::Driving.is_moving());
    }
}
