//! Keyword-first intent classification with an optional LLM fallback.
//!
//! Every keyword of every intent is tested as a case-insensitive substring.
//! A hit scores `len(keyword) / len(text)` in characters; the highest score
//! wins, with ties going to the intent declared first. Confidence is the
//! score scaled by three and capped at one.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::models::{ChatMessage, ClassifierConfig, Intent, IntentType, Slots};
use crate::domain::ports::LlmClient;

/// Scales a keyword/text length ratio into a confidence score.
pub const KEYWORD_CONFIDENCE_MULTIPLIER: f64 = 3.0;

static CONTACT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"给(.+?)(?:打电话|发消息|发短信|$)").expect("contact pattern is a valid regex")
});

static TEMPERATURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*[度℃°]").expect("temperature pattern is a valid regex")
});

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("number pattern is a valid regex"));

const VOLUME_UP_WORDS: &[&str] = &["大", "高", "up", "louder"];
const VOLUME_DOWN_WORDS: &[&str] = &["小", "低", "down", "quieter"];

/// Trigger phrases for an intent, Chinese and English.
pub const fn keywords(intent: IntentType) -> &'static [&'static str] {
    match intent {
        IntentType::NavigateTo => &["导航到", "导航去", "去往", "navigate to", "go to", "带我去"],
        IntentType::SearchPoi => &["搜索", "查找", "附近的", "找一下", "search", "find nearby"],
        IntentType::CancelNavigation => &["取消导航", "停止导航", "cancel navigation"],
        IntentType::MakeCall => &["打电话", "呼叫", "拨打", "call", "dial"],
        IntentType::AnswerCall => &["接电话", "接听", "answer"],
        IntentType::RejectCall => &["拒接", "挂断", "reject", "hang up"],
        IntentType::SendMessage => &["发消息", "发短信", "发送", "send message", "text"],
        IntentType::PlayMusic => &[
            "播放音乐",
            "播放歌曲",
            "放一首",
            "play music",
            "play song",
            "来一首",
        ],
        IntentType::PauseMusic => &["暂停音乐", "暂停播放", "停止播放", "pause music", "stop music"],
        IntentType::NextTrack => &["下一首", "切歌", "换一首", "next song", "next track", "skip"],
        IntentType::AdjustVolume => &["音量", "声音大", "声音小", "volume", "调高音量", "调低音量"],
        IntentType::SetTemperature => &["温度", "空调", "制冷", "制热", "temperature", "AC", "暖风"],
        IntentType::OpenWindow => &["开窗", "打开车窗", "open window"],
        IntentType::CloseWindow => &["关窗", "关闭车窗", "close window"],
        IntentType::SetSeat => &["座椅", "seat", "座位加热", "座位通风"],
        IntentType::SetLight => &["车灯", "大灯", "氛围灯", "light", "灯光"],
        IntentType::EmergencyCall => &["紧急呼叫", "SOS", "emergency", "报警", "急救"],
        IntentType::AdasControl => &["自动驾驶", "辅助驾驶", "ADAS", "autopilot", "车道保持"],
        IntentType::FatigueAlert => &["疲劳", "困了", "fatigue", "tired", "休息提醒"],
        IntentType::WatchVideo => &["看视频", "播放视频", "watch video"],
        IntentType::BrowseWeb => &["浏览网页", "上网", "browse web"],
        IntentType::Query | IntentType::Chat | IntentType::Unknown => &[],
    }
}

/// Classifies utterances into cockpit intents.
#[derive(Clone)]
pub struct IntentClassifier {
    config: ClassifierConfig,
    llm: Option<Arc<dyn LlmClient>>,
}

impl IntentClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config, llm: None }
    }

    /// Classifier with default threshold and no LLM fallback.
    pub fn with_defaults() -> Self {
        Self::new(ClassifierConfig::default())
    }

    /// Attach an LLM used when keyword confidence is at or below the threshold.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Classify `text`, consulting the LLM fallback for weak keyword matches.
    pub async fn classify(&self, text: &str) -> Intent {
        let Some(llm) = &self.llm else {
            return self.classify_without_llm(text);
        };

        let intent = self.classify_by_keywords(text);
        if intent.confidence > self.config.confidence_threshold {
            return intent;
        }
        self.classify_with_llm(llm.as_ref(), text).await
    }

    /// Keyword classification gated by the confidence threshold.
    ///
    /// A match at or below the threshold yields `Unknown` with confidence 0,
    /// even when an LLM is attached.
    pub fn classify_without_llm(&self, text: &str) -> Intent {
        let intent = self.classify_by_keywords(text);
        if intent.confidence > self.config.confidence_threshold {
            return intent;
        }
        debug!(
            confidence = intent.confidence,
            "keyword match below threshold and no LLM fallback"
        );
        Intent::unknown(text)
    }

    /// Pure keyword classification; never calls the LLM.
    pub fn classify_by_keywords(&self, text: &str) -> Intent {
        let lowered = text.to_lowercase();
        let text_len = text.chars().count().max(1) as f64;

        let mut best: Option<(IntentType, f64)> = None;
        for intent_type in IntentType::ALL {
            for keyword in keywords(intent_type) {
                if !lowered.contains(&keyword.to_lowercase()) {
                    continue;
                }
                let score = keyword.chars().count() as f64 / text_len;
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((intent_type, score));
                }
            }
        }

        let Some((intent_type, score)) = best else {
            return Intent::unknown(text);
        };

        let confidence = (score * KEYWORD_CONFIDENCE_MULTIPLIER).min(1.0);
        Intent::new(intent_type, confidence, text).with_slots(extract_slots(text, intent_type))
    }

    async fn classify_with_llm(&self, llm: &dyn LlmClient, text: &str) -> Intent {
        let intent_names: Vec<&str> = IntentType::ALL.iter().map(IntentType::as_str).collect();
        let messages = [
            ChatMessage::system(format!(
                "你是车载语音助手的意图识别模块。请识别用户输入的意图，只输出 JSON：\
                 {{\"intent\": \"<one of {}>\", \"confidence\": <0.0-1.0>, \"slots\": {{<key-value pairs>}}}}",
                intent_names.join(", ")
            )),
            ChatMessage::user(text),
        ];

        match llm.generate_json(&messages).await {
            Ok(reply) => parse_llm_intent(&reply, text),
            Err(e) => {
                warn!(llm = llm.name(), error = %e, "LLM intent classification failed");
                Intent::unknown(text)
            }
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn parse_llm_intent(reply: &Value, text: &str) -> Intent {
    let intent_type = reply
        .get("intent")
        .and_then(Value::as_str)
        .map_or(IntentType::Unknown, IntentType::from_str_lossy);
    let confidence = reply.get("confidence").and_then(Value::as_f64).unwrap_or(0.5);
    let slots = reply
        .get("slots")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    Intent::new(intent_type, confidence, text).with_slots(slots)
}

/// Extract intent-specific slots from the raw utterance.
pub fn extract_slots(text: &str, intent_type: IntentType) -> Slots {
    let mut slots = Slots::new();

    match intent_type {
        IntentType::NavigateTo | IntentType::SearchPoi => {
            if let Some(destination) = text_after_keyword(text, intent_type) {
                slots.insert("destination".into(), json!(destination));
            }
        }
        IntentType::MakeCall | IntentType::SendMessage => {
            if let Some(caps) = CONTACT_PATTERN.captures(text) {
                let contact = caps[1].trim();
                if !contact.is_empty() {
                    slots.insert("contact".into(), json!(contact));
                }
            }
        }
        IntentType::PlayMusic => {
            if let Some(query) = text_after_keyword(text, intent_type) {
                slots.insert("query".into(), json!(query));
            }
        }
        IntentType::SetTemperature => {
            if let Some(value) = first_integer(&TEMPERATURE_PATTERN, text) {
                slots.insert("temperature".into(), json!(value));
            }
        }
        IntentType::AdjustVolume => {
            if let Some(level) = first_integer(&NUMBER_PATTERN, text) {
                slots.insert("level".into(), json!(level));
            } else if contains_any(text, VOLUME_UP_WORDS) {
                slots.insert("direction".into(), json!("up"));
            } else if contains_any(text, VOLUME_DOWN_WORDS) {
                slots.insert("direction".into(), json!("down"));
            }
        }
        _ => {}
    }

    slots
}

/// Text following the last occurrence of the first keyword present.
fn text_after_keyword(text: &str, intent_type: IntentType) -> Option<String> {
    keywords(intent_type).iter().find_map(|keyword| {
        let end = keyword_end(text, keyword)?;
        let rest = text[end..].trim();
        (!rest.is_empty()).then(|| rest.to_string())
    })
}

/// Byte offset just past the last occurrence of `keyword`.
///
/// ASCII keywords match case-insensitively; `to_ascii_lowercase` keeps byte
/// offsets aligned with the original text.
fn keyword_end(text: &str, keyword: &str) -> Option<usize> {
    if let Some(start) = text.rfind(keyword) {
        return Some(start + keyword.len());
    }
    if keyword.is_ascii() {
        let haystack = text.to_ascii_lowercase();
        let needle = keyword.to_ascii_lowercase();
        return haystack.rfind(&needle).map(|start| start + needle.len());
    }
    None
}

fn first_integer(pattern: &Regex, text: &str) -> Option<i64> {
    pattern.captures(text).and_then(|caps| caps[1].parse().ok())
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    words.iter().any(|w| lowered.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::MockLlmClient;
    use crate::domain::models::DomainType;

    fn classifier() -> IntentClassifier {
        IntentClassifier::with_defaults()
    }

    #[test]
    fn test_navigation_with_destination() {
        let intent = classifier().classify_by_keywords("导航到天安门");
        assert_eq!(intent.intent_type, IntentType::NavigateTo);
        assert_eq!(intent.domain, DomainType::Navigation);
        assert!((intent.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(intent.slots["destination"], "天安门");
    }

    #[test]
    fn test_confidence_formula() {
        // "skip" (4 chars) in a 20-char sentence: 4/20 * 3 = 0.6
        let text = "please skip this one";
        assert_eq!(text.chars().count(), 20);
        let intent = classifier().classify_by_keywords(text);
        assert_eq!(intent.intent_type, IntentType::NextTrack);
        assert!((intent.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_incidental_substring_is_unknown_without_llm() {
        // "ac" inside "fact": 2/26 * 3 = 0.23
        let text = "tell me a fact about space";
        let raw = classifier().classify_by_keywords(text);
        assert_eq!(raw.intent_type, IntentType::SetTemperature);
        assert!(raw.confidence < 0.5);

        let gated = classifier().classify_without_llm(text);
        assert!(gated.is_unknown());
        assert_eq!(gated.confidence, 0.0);
    }

    #[test]
    fn test_longest_keyword_wins() {
        // "紧急呼叫" (EmergencyCall, 4 chars) beats "呼叫" (MakeCall, 2 chars)
        let intent = classifier().classify_by_keywords("紧急呼叫");
        assert_eq!(intent.intent_type, IntentType::EmergencyCall);
        assert_eq!(intent.domain, DomainType::Safety);
    }

    #[test]
    fn test_volume_direction_slot() {
        let intent = classifier().classify_by_keywords("把音量调高一点");
        assert_eq!(intent.intent_type, IntentType::AdjustVolume);
        assert_eq!(intent.slots["direction"], "up");
    }

    #[test]
    fn test_tie_goes_to_first_declared_intent() {
        // "搜索" (SearchPoi) and "呼叫" (MakeCall) are both 2 chars
        let intent = classifier().classify_by_keywords("搜索呼叫");
        assert_eq!(intent.intent_type, IntentType::SearchPoi);
    }

    #[test]
    fn test_case_insensitive_match() {
        let intent = classifier().classify_by_keywords("SOS");
        assert_eq!(intent.intent_type, IntentType::EmergencyCall);
        let intent = classifier().classify_by_keywords("sos");
        assert_eq!(intent.intent_type, IntentType::EmergencyCall);

        let intent = classifier().classify_by_keywords("Navigate To Paris");
        assert_eq!(intent.intent_type, IntentType::NavigateTo);
        assert_eq!(intent.slots["destination"], "Paris");
    }

    #[test]
    fn test_no_match_is_unknown_with_zero_confidence() {
        let intent = classifier().classify_by_keywords("今天天气怎么样");
        assert!(intent.is_unknown());
        assert_eq!(intent.confidence, 0.0);
        assert!(intent.slots.is_empty());
    }

    #[test]
    fn test_contact_slot() {
        let intent = classifier().classify_by_keywords("给妈妈打电话");
        assert_eq!(intent.intent_type, IntentType::MakeCall);
        assert_eq!(intent.slots["contact"], "妈妈");

        let slots = extract_slots("给老王发消息", IntentType::SendMessage);
        assert_eq!(slots["contact"], "老王");
    }

    #[test]
    fn test_temperature_and_volume_slots() {
        let slots = extract_slots("空调调到24度", IntentType::SetTemperature);
        assert_eq!(slots["temperature"], 24);

        let slots = extract_slots("音量调到30", IntentType::AdjustVolume);
        assert_eq!(slots["level"], 30);

        let slots = extract_slots("声音小一点", IntentType::AdjustVolume);
        assert_eq!(slots["direction"], "down");
    }

    #[test]
    fn test_music_query_slot() {
        let intent = classifier().classify_by_keywords("来一首晴天");
        assert_eq!(intent.intent_type, IntentType::PlayMusic);
        assert_eq!(intent.slots["query"], "晴天");
    }

    #[test]
    fn test_watch_video_is_general() {
        let intent = classifier().classify_by_keywords("我想看视频");
        assert_eq!(intent.intent_type, IntentType::WatchVideo);
        assert_eq!(intent.domain, DomainType::General);
    }

    #[tokio::test]
    async fn test_low_confidence_without_llm_is_unknown() {
        // "call" scores 4/40 * 3 = 0.3
        let text = "could you maybe call someone for me ok??";
        assert_eq!(text.chars().count(), 40);
        let intent = classifier().classify(text).await;
        assert!(intent.is_unknown());
        assert_eq!(intent.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_high_confidence_skips_llm() {
        let llm = Arc::new(MockLlmClient::failing("must not be called"));
        let classifier = classifier().with_llm(llm.clone());
        let intent = classifier.classify("导航到天安门").await;
        assert_eq!(intent.intent_type, IntentType::NavigateTo);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_fallback_is_trusted() {
        let llm = Arc::new(MockLlmClient::with_json(serde_json::json!({
            "intent": "set_seat",
            "confidence": 0.82,
            "slots": {"mode": "heating"}
        })));
        let classifier = classifier().with_llm(llm.clone());
        let intent = classifier.classify("我有点冷").await;
        assert_eq!(intent.intent_type, IntentType::SetSeat);
        assert!((intent.confidence - 0.82).abs() < 1e-9);
        assert_eq!(intent.slots["mode"], "heating");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_llm_failure_degrades_to_unknown() {
        let llm = Arc::new(MockLlmClient::failing("boom"));
        let intent = classifier().with_llm(llm).classify("我有点冷").await;
        assert!(intent.is_unknown());
        assert_eq!(intent.confidence, 0.0);
    }
}
