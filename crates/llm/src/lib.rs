//! docqa LLM Library
//!
//! Abstraction over the remote generation capability:
//! - `LlmClient` trait with request/response types
//! - Ollama provider (local-first default)
//! - Scripted mock provider for tests
//! - Provider factory

pub mod client;
pub mod factory;
pub mod providers;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockLlmClient, MockReply, OllamaClient};
