//! Top-level request dispatcher.
//!
//! One utterance in, one response out: classify, gate the primary intent,
//! then either execute directly (fast path) or reason first (deep path).
//! Memory is updated before and after; memory and LLM failures degrade the
//! request instead of failing it.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Semaphore;
use tracing::field::Empty;
use tracing::{info, instrument, warn};

use crate::domain::models::{
    AgentContext, AgentResponse, Config, DrivingState, Intent, IntentResult, MemoryContext,
    SafetyVerdict,
};
use crate::domain::ports::{Agent, ConversationMemory, LlmClient};
use crate::services::intent_classifier::IntentClassifier;
use crate::services::plan_execute::PlanExecuteAgent;
use crate::services::reasoning_agent::ReasoningAgent;
use crate::services::safety_gate::SafetyGate;
use crate::services::task_executor::TaskExecutor;

pub const PATH_FAST: &str = "fast";
pub const PATH_DEEP: &str = "deep";

/// Response content for a request refused by the safety gate.
pub fn blocked_content(reason: &str) -> String {
    format!("操作被阻止: {reason}")
}

/// Entry point of the orchestration pipeline.
pub struct Dispatcher {
    classifier: IntentClassifier,
    safety_gate: SafetyGate,
    reasoning_agent: Arc<dyn Agent>,
    plan_agent: Arc<dyn Agent>,
    memory: Arc<dyn ConversationMemory>,
    fast_path_threshold: f64,
}

impl Dispatcher {
    /// Wire the pipeline from configuration.
    ///
    /// `llm` serves both the classifier fallback and the reasoning agent;
    /// pass `None` to run purely rule-based.
    pub fn new(
        config: &Config,
        memory: Arc<dyn ConversationMemory>,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        let keyword_classifier = IntentClassifier::new(config.classifier.clone());
        let classifier = match &llm {
            Some(llm) => keyword_classifier.clone().with_llm(llm.clone()),
            None => keyword_classifier.clone(),
        };
        let safety_gate = SafetyGate::new(&config.safety);

        let permits = Arc::new(Semaphore::new(config.scheduler.max_parallel_tasks.max(1)));
        let plan_agent = PlanExecuteAgent::new(
            TaskExecutor::new(&config.scheduler),
            safety_gate.clone(),
            config.scheduler.clone(),
        )
        .with_permits(permits);

        Self {
            classifier,
            safety_gate,
            reasoning_agent: Arc::new(ReasoningAgent::new(keyword_classifier, llm)),
            plan_agent: Arc::new(plan_agent),
            memory,
            fast_path_threshold: config.fast_path_threshold,
        }
    }

    /// Replace the plan-execute agent, e.g. one with custom handlers.
    pub fn with_plan_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.plan_agent = agent;
        self
    }

    /// Replace the deep-path reasoning agent.
    pub fn with_reasoning_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.reasoning_agent = agent;
        self
    }

    pub async fn classify(&self, text: &str) -> Intent {
        self.classifier.classify(text).await
    }

    pub fn check_safety(&self, intent: &Intent, driving_state: DrivingState) -> SafetyVerdict {
        self.safety_gate.check(intent, driving_state)
    }

    /// Handle one utterance end to end.
    #[instrument(skip(self), fields(intent = Empty, confidence = Empty, path = Empty))]
    pub async fn process(&self, user_input: &str, driving_state: DrivingState) -> AgentResponse {
        if let Err(e) = self.memory.add_user_message(user_input).await {
            warn!(error = %e, "failed to record user message");
        }

        let intent = self.classifier.classify(user_input).await;
        let span = tracing::Span::current();
        span.record("intent", intent.intent_type.as_str());
        span.record("confidence", intent.confidence);
        info!(
            intent = %intent.intent_type,
            confidence = intent.confidence,
            "classified utterance"
        );

        let verdict = self.safety_gate.check(&intent, driving_state);
        if !verdict.is_safe {
            let response = AgentResponse::new(blocked_content(&verdict.blocked_reason), 1.0)
                .with_metadata("safety_blocked", true)
                .with_metadata("intent", intent.intent_type.as_str());
            self.remember_reply(&response).await;
            return response;
        }

        let memory = match self.memory.get_context().await {
            Ok(memory) => memory,
            Err(e) => {
                warn!(error = %e, "memory context unavailable, continuing without it");
                MemoryContext::default()
            }
        };
        let context = AgentContext::new(memory, driving_state);

        let mut response = if intent.confidence >= self.fast_path_threshold {
            span.record("path", PATH_FAST);
            let context = context.with_intent_results(vec![IntentResult::from(&intent)]);
            self.plan_agent
                .process(user_input, &context)
                .await
                .with_metadata("path", PATH_FAST)
        } else {
            span.record("path", PATH_DEEP);
            self.deep_path(user_input, context).await
        };

        response
            .metadata
            .insert("intent".into(), json!(intent.intent_type.as_str()));
        if verdict.requires_confirmation {
            response.mark_requires_confirmation();
        }

        self.remember_reply(&response).await;
        response
    }

    async fn deep_path(&self, user_input: &str, context: AgentContext) -> AgentResponse {
        let reasoning = self.reasoning_agent.process(user_input, &context).await;
        if reasoning.intent_results.is_empty() {
            return reasoning.with_metadata("path", PATH_DEEP);
        }

        let reasoning_text = reasoning.metadata.get("reasoning").cloned().unwrap_or(json!(""));
        let context = context.with_intent_results(reasoning.intent_results);
        self.plan_agent
            .process(user_input, &context)
            .await
            .with_metadata("path", PATH_DEEP)
            .with_metadata("reasoning", reasoning_text)
    }

    async fn remember_reply(&self, response: &AgentResponse) {
        if let Err(e) = self.memory.add_assistant_message(&response.content).await {
            warn!(error = %e, "failed to record assistant reply");
        }
    }
}
