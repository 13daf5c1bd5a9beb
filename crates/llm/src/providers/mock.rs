//! Scripted mock generation provider for tests and offline use.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use docqa_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A canned outcome for one `complete` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text as the completion content.
    Text(String),
    /// Fail with `GenerationUnavailable`.
    Unavailable(String),
    /// Fail with `GenerationTimeout`.
    Timeout(u64),
}

/// Mock client that replays a queued script of responses and records
/// every prompt it receives.
///
/// When the script is exhausted it echoes the tail of the prompt, so
/// tests that only care about plumbing need no setup.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    /// Create an empty mock (echo behavior).
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next unanswered call.
    pub fn push_reply(&self, reply: MockReply) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// Queue a plain text reply.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push_reply(MockReply::Text(text.into()));
    }

    /// Number of `complete` calls observed so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Copies of all requests observed so far, in call order.
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let reply = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        let content = match reply {
            Some(MockReply::Text(text)) => text,
            Some(MockReply::Unavailable(msg)) => {
                return Err(AppError::GenerationUnavailable(msg))
            }
            Some(MockReply::Timeout(secs)) => return Err(AppError::GenerationTimeout(secs)),
            None => {
                // Echo fallback: last 80 chars of the prompt
                let tail: String = request
                    .prompt
                    .chars()
                    .rev()
                    .take(80)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                format!("echo: {}", tail)
            }
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}
