//! LLM client adapters.

pub mod mock;
pub mod openai_compat;
pub mod retry;

pub use mock::{MockLlmClient, MockReply};
pub use openai_compat::OpenAiCompatClient;
pub use retry::RetryPolicy;
