//! Chain-of-thought reasoning agent for ambiguous requests.
//!
//! Asks the LLM to reason step by step and return every intent it finds.
//! Without an LLM, or when the call fails, it falls back to keyword
//! classification.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::models::{AgentContext, AgentResponse, ChatMessage, IntentResult};
use crate::domain::ports::{Agent, LlmClient, LlmError};
use crate::services::intent_classifier::IntentClassifier;

/// Recent turns included in the prompt.
const CONTEXT_MESSAGES: usize = 3;

pub const NOT_UNDERSTOOD: &str = "抱歉，我没有理解您的意思，请换一种说法";

const SYSTEM_PROMPT: &str = "你是智能座舱的语义理解Agent。请使用链式思维(Chain-of-Thought)逐步分析用户意图。\n\n\
分析步骤：\n\
1. 理解用户字面意思\n\
2. 分析上下文和隐含意图\n\
3. 识别所有需要执行的操作\n\
4. 评估安全性和优先级\n\
5. 生成最终理解结果\n\n\
返回JSON格式：\n\
{\"reasoning\": \"推理过程\", \"intents\": [{\"type\": \"意图类型\", \"confidence\": 0.0-1.0, \"slots\": {}}], \"response\": \"回复用户的话\"}";

/// Deep-path agent that proposes intents for the plan-execute agent.
pub struct ReasoningAgent {
    llm: Option<Arc<dyn LlmClient>>,
    classifier: IntentClassifier,
}

impl ReasoningAgent {
    /// `classifier` supplies the keyword matcher and its confidence threshold;
    /// its own LLM, if any, is never consulted.
    pub fn new(classifier: IntentClassifier, llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm, classifier }
    }

    /// Rule-based agent with no LLM.
    pub fn rule_based() -> Self {
        Self::new(IntentClassifier::with_defaults(), None)
    }

    fn build_messages(user_input: &str, context: &AgentContext) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];

        let recent = &context.memory.recent_messages;
        let skip = recent.len().saturating_sub(CONTEXT_MESSAGES);
        messages.extend(recent.iter().skip(skip).cloned());

        if !context.memory.preferences.is_empty() {
            let prefs: Vec<String> = context
                .memory
                .preferences
                .iter()
                .map(|p| format!("- {}: {}", p.key, p.content))
                .collect();
            messages.push(ChatMessage::system(format!("用户偏好：\n{}", prefs.join("\n"))));
        }

        messages.push(ChatMessage::user(user_input));
        messages
    }

    async fn reason_with_llm(
        &self,
        llm: &dyn LlmClient,
        user_input: &str,
        context: &AgentContext,
    ) -> Result<AgentResponse, LlmError> {
        let messages = Self::build_messages(user_input, context);
        let reply = llm.generate_json(&messages).await?;
        Ok(parse_reasoning_reply(&reply))
    }

    fn rule_based_process(&self, user_input: &str) -> AgentResponse {
        let intent = self.classifier.classify_without_llm(user_input);
        if intent.is_unknown() {
            return AgentResponse::new(NOT_UNDERSTOOD, 0.0).with_metadata("fallback", "rule_based");
        }

        let mut response = AgentResponse::new(
            format!("已识别意图: {}", intent.intent_type),
            intent.confidence,
        )
        .with_metadata("fallback", "rule_based");
        response.intent_results = vec![IntentResult::from(&intent)];
        response
    }
}

#[async_trait]
impl Agent for ReasoningAgent {
    fn name(&self) -> &str {
        "reasoning_agent"
    }

    async fn process(&self, user_input: &str, context: &AgentContext) -> AgentResponse {
        let Some(llm) = &self.llm else {
            debug!("no LLM configured, using rule-based reasoning");
            return self.rule_based_process(user_input);
        };

        match self.reason_with_llm(llm.as_ref(), user_input, context).await {
            Ok(response) => response,
            Err(e) => {
                warn!(llm = llm.name(), error = %e, "reasoning LLM call failed, using rule-based fallback");
                self.rule_based_process(user_input)
            }
        }
    }
}

/// Read `{reasoning, intents, response}`; malformed intent entries are skipped.
fn parse_reasoning_reply(reply: &Value) -> AgentResponse {
    let intents: Vec<IntentResult> = reply
        .get("intents")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    let confidence = intents
        .iter()
        .map(|i| i.confidence)
        .fold(0.0_f64, f64::max);
    let content = reply.get("response").and_then(Value::as_str).unwrap_or_default();
    let reasoning = reply.get("reasoning").and_then(Value::as_str).unwrap_or_default();

    let mut response = AgentResponse::new(content, confidence).with_metadata("reasoning", json!(reasoning));
    response.intent_results = intents;
    response
}
