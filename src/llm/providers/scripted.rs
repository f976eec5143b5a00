//! Scripted LLM provider: replays a fixed queue of replies in order.
//!
//! Every call pops the next reply and records the request it answered, so
//! tests can assert both what each stage was asked and what it displayed.
//! Clones share the same script.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::llm::{LlmResponse, ProviderError};

/// A request the scripted provider answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub system: Option<String>,
    pub content: String,
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<LlmResponse, String>>,
    requests: Vec<RecordedRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
    /// Sleep before answering, to stand in for a slow endpoint.
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let p = Self::default();
        for r in replies {
            p.push_reply(r);
        }
        p
    }

    /// Answer every call only after `delay` has elapsed.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a plain text reply.
    pub fn push_reply(&self, text: impl Into<String>) {
        self.push_response(LlmResponse { text: text.into(), ..Default::default() });
    }

    /// Queue a full response (text + reasoning + usage).
    pub fn push_response(&self, response: LlmResponse) {
        self.lock().replies.push_back(Ok(response));
    }

    /// Queue a failure; the matching call returns `ProviderError::Request`.
    pub fn push_error(&self, message: impl Into<String>) {
        self.lock().replies.push_back(Err(message.into()));
    }

    /// Requests answered so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        self.lock().replies.len()
    }

    pub async fn complete(&self, content: &str, system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.lock();
        script.requests.push(RecordedRequest {
            system: system.map(str::to_string),
            content: content.to_string(),
        });
        match script.replies.pop_front() {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(msg)) => Err(ProviderError::Request(msg)),
            None => Err(ProviderError::Request("script exhausted".into())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // A poisoned script only means another test thread panicked mid-call;
        // the queue itself is still consistent.
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}
