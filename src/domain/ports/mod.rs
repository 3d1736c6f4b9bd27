//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - Agent: one utterance in, one response out
//! - LlmClient: structured LLM calls for classification and reasoning
//! - ConversationMemory: recent turns, summary and preferences
//!
//! These traits keep the orchestration services independent of any
//! particular model backend or memory store.

pub mod agent;
pub mod llm_client;
pub mod memory;

pub use agent::Agent;
pub use llm_client::{extract_json, LlmClient, LlmError};
pub use memory::ConversationMemory;
