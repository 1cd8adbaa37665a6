//! LLM provider abstraction: chat and embeddings through an Ollama gateway.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ollama;
pub mod provider;

pub use error::LlmError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use provider::{LlmProvider, Message, Role};
