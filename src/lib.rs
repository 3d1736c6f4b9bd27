//! Cockpit Agent - in-vehicle voice assistant orchestrator
//!
//! Turns a driver's utterance into vehicle actions: keyword classification
//! with an optional LLM fallback, a driving-state safety gate, and a
//! dependency-aware task scheduler that executes actions in parallel waves.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the ports (`Agent`,
//!   `LlmClient`, `ConversationMemory`)
//! - **Service Layer** (`services`): classifier, safety gate, task graph,
//!   scheduler, executor, plan-execute and reasoning agents, dispatcher
//! - **Adapters** (`adapters`): LLM clients and conversation memory
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cockpit_agent::adapters::memory::InMemoryConversation;
//! use cockpit_agent::{Config, Dispatcher, DrivingState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let memory = Arc::new(InMemoryConversation::with_defaults());
//!     let dispatcher = Dispatcher::new(&Config::default(), memory, None);
//!     let response = dispatcher.process("导航到天安门", DrivingState::Parked).await;
//!     println!("{}", response.content);
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AgentContext, AgentResponse, Config, DomainType, DrivingState, Intent, IntentType,
    SafetyVerdict, Task, TaskStatus,
};
pub use domain::ports::{Agent, ConversationMemory, LlmClient, LlmError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    Dispatcher, IntentClassifier, PlanExecuteAgent, ReasoningAgent, SafetyGate, TaskExecutor,
    TaskGraph, TaskScheduler,
};
