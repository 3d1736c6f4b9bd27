//! End-to-end requests through the dispatcher and plan-execute agent.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{field, intent};

use cockpit_agent::adapters::llm::MockLlmClient;
use cockpit_agent::adapters::memory::InMemoryConversation;
use cockpit_agent::domain::models::{MemoryContext, ResultMap};
use cockpit_agent::services::plan_execute::ALL_DONE;
use cockpit_agent::services::HandlerResult;
use cockpit_agent::{
    Agent, AgentContext, Config, ConversationMemory, Dispatcher, DomainType, DrivingState,
    IntentType, PlanExecuteAgent,
};

fn dispatcher() -> Dispatcher {
    Dispatcher::new(
        &Config::default(),
        Arc::new(InMemoryConversation::with_defaults()),
        None,
    )
}

#[tokio::test]
async fn test_navigation_takes_fast_path() {
    let dispatcher = dispatcher();

    let classified = dispatcher.classify("导航到天安门").await;
    assert_eq!(classified.intent_type, IntentType::NavigateTo);
    assert_eq!(classified.domain, DomainType::Navigation);
    assert_eq!(classified.slots["destination"], "天安门");
    assert!(dispatcher.check_safety(&classified, DrivingState::Parked).is_safe);

    let response = dispatcher.process("导航到天安门", DrivingState::Parked).await;
    assert_eq!(response.metadata["path"], "fast");
    assert_eq!(response.task_results.len(), 1);
    assert_eq!(field(&response.task_results[0], "status"), "success");
    assert!(response.content.contains("天安门"));
    assert!(!response.requires_confirmation);
}

#[tokio::test]
async fn test_video_blocked_while_driving() {
    let response = dispatcher().process("我想看视频", DrivingState::Driving).await;

    assert!(response.content.starts_with("操作被阻止: "));
    assert!(response.task_results.is_empty());
    assert_eq!(response.metadata["safety_blocked"], true);
}

#[tokio::test]
async fn test_video_allowed_when_parked() {
    let response = dispatcher().process("我想看视频", DrivingState::Parked).await;
    assert!(!response.content.starts_with("操作被阻止"));
    assert_eq!(response.task_results.len(), 1);
}

#[tokio::test]
async fn test_second_navigation_supersedes_first() {
    let agent = PlanExecuteAgent::with_defaults();
    let context = AgentContext::new(MemoryContext::default(), DrivingState::Parked)
        .with_intent_results(vec![
            intent("navigate_to", json!({"destination": "天安门"})),
            intent("navigate_to", json!({"destination": "故宫"})),
        ]);

    let response = agent.process("先去天安门，算了去故宫", &context).await;

    assert_eq!(response.task_results.len(), 1);
    let result = &response.task_results[0];
    assert_eq!(field(result, "status"), "success");
    assert!(field(result, "message").contains("故宫"));

    let cancelled = response.metadata["cancelled_tasks"].as_array().unwrap();
    assert_eq!(cancelled.len(), 1);
    assert!(cancelled[0]["reason"]
        .as_str()
        .unwrap()
        .starts_with("superseded by "));
}

#[tokio::test]
async fn test_multi_intent_runs_safety_first() {
    let agent = PlanExecuteAgent::with_defaults();
    let context = AgentContext::new(MemoryContext::default(), DrivingState::Driving)
        .with_intent_results(vec![
            intent("play_music", json!({})),
            intent("emergency_call", json!({})),
        ]);

    let response = agent.process("放首歌然后紧急呼叫", &context).await;

    assert_eq!(response.content.split('；').count(), 2);
    assert_eq!(field(&response.task_results[0], "domain"), "safety");
    assert_eq!(field(&response.task_results[1], "domain"), "music");

    let waves = response.metadata["execution_waves"].as_array().unwrap();
    assert_eq!(waves.len(), 2);
    assert!(response.metadata["safety_warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w == "紧急呼叫将立即执行"));
}

#[tokio::test]
async fn test_low_confidence_uses_reasoning_llm() {
    let llm = Arc::new(MockLlmClient::with_json(json!({
        "reasoning": "用户觉得冷，需要升温并关窗",
        "intents": [
            {"type": "set_temperature", "confidence": 0.8, "slots": {"temperature": 24}},
            {"type": "close_window", "confidence": 0.7}
        ],
        "response": "好的"
    })));
    let memory = Arc::new(InMemoryConversation::with_defaults());
    let dispatcher = Dispatcher::new(&Config::default(), memory.clone(), Some(llm.clone()));

    let response = dispatcher
        .process("我有点冷，能帮我想想办法吗", DrivingState::Parked)
        .await;

    assert_eq!(response.metadata["path"], "deep");
    assert_eq!(response.metadata["reasoning"], "用户觉得冷，需要升温并关窗");
    assert_eq!(response.task_results.len(), 2);
    assert!(response
        .task_results
        .iter()
        .all(|r| field(r, "status") == "success"));

    let context = memory.get_context().await.unwrap();
    assert_eq!(context.recent_messages.len(), 2);
    assert_eq!(context.recent_messages[1].content, response.content);
}

#[tokio::test]
async fn test_all_done_summary_when_nothing_to_report() {
    let mut agent = PlanExecuteAgent::with_defaults();
    agent.register_handler("set_seat", |_: &cockpit_agent::Task| -> HandlerResult {
        let mut result = ResultMap::new();
        result.insert("status".into(), json!("success"));
        Ok(result)
    });

    let context = AgentContext::new(MemoryContext::default(), DrivingState::Parked)
        .with_intent_results(vec![intent("set_seat", json!({}))]);
    let response = agent.process("调一下座椅", &context).await;

    assert_eq!(response.content, ALL_DONE);
    assert_eq!(response.task_results.len(), 1);
}
