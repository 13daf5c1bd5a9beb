//! Generation provider implementations.

pub mod mock;
pub mod ollama;

pub use mock::{MockLlmClient, MockReply};
pub use ollama::OllamaClient;
