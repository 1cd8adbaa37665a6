//! Agent wiring for docent: configuration, channels, the retrieval tool, and
//! the conversational loop.

pub mod agent;
pub mod channel;
pub mod config;
pub mod rag;
pub mod tools;

pub use agent::Agent;
pub use channel::{Channel, ChannelError, ChannelMessage, CliChannel};
pub use config::{Config, ConfigError};
pub use rag::RagStatus;
pub use tools::retrieval::{RetrievalTool, RetrievedChunk};
