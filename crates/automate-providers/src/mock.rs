//! Scripted inference client for testing pipeline components.
//!
//! Responses are consumed in order from a per-model queue, then from a
//! shared queue, then matched by input substring, then taken from the
//! default. A call with nothing to answer it fails, so tests notice
//! unexpected model traffic.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use automate_core::{ChatRequest, Error, IgnoreLock as _, InferenceClient, Result};

/// One scripted reply.
#[derive(Debug, Clone)]
enum Scripted {
    /// Reply text.
    Text(String),
    /// Provider failure with this message.
    Failure(String),
}

impl Scripted {
    /// Converts the script entry into the call result.
    fn into_result(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Failure(message) => Err(Error::Provider(message)),
        }
    }
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// The request as received.
    pub request: ChatRequest,
    /// Whether the JSON-biased variant was used.
    pub json_mode: bool,
}

/// Mutable script shared between clones.
#[derive(Default)]
struct Script {
    /// FIFO replies keyed by model name.
    by_model: HashMap<String, VecDeque<Scripted>>,
    /// FIFO replies for any model.
    shared: VecDeque<Scripted>,
    /// Replies keyed by an input substring.
    patterns: Vec<(String, String)>,
    /// Reply used when nothing else matches.
    default_response: Option<String>,
}

/// Inference client returning pre-defined replies.
#[derive(Clone, Default)]
pub struct MockInferenceClient {
    /// Reply script
    script: Arc<Mutex<Script>>,
    /// Call history for verification
    call_history: Arc<Mutex<Vec<MockCall>>>,
}

impl MockInferenceClient {
    /// Creates a client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for any model.
    #[must_use]
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push_reply(text);
        self
    }

    /// Queues several replies for any model.
    #[must_use]
    pub fn with_replies<I, S>(self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for text in texts {
            self.push_reply(text);
        }
        self
    }

    /// Queues a reply for calls to `model`.
    #[must_use]
    pub fn with_model_reply(self, model: impl Into<String>, text: impl Into<String>) -> Self {
        self.script
            .lock_ignore_poison()
            .by_model
            .entry(model.into())
            .or_default()
            .push_back(Scripted::Text(text.into()));
        self
    }

    /// Queues a provider failure for any model.
    #[must_use]
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.script
            .lock_ignore_poison()
            .shared
            .push_back(Scripted::Failure(message.into()));
        self
    }

    /// Replies with `text` whenever the input contains `pattern`.
    #[must_use]
    pub fn with_response(self, pattern: impl Into<String>, text: impl Into<String>) -> Self {
        self.script
            .lock_ignore_poison()
            .patterns
            .push((pattern.into(), text.into()));
        self
    }

    /// Sets a reply for calls nothing else matches.
    #[must_use]
    pub fn with_default_response(self, text: impl Into<String>) -> Self {
        self.script.lock_ignore_poison().default_response = Some(text.into());
        self
    }

    /// Queues a reply for any model on an existing client.
    pub fn push_reply(&self, text: impl Into<String>) {
        self.script
            .lock_ignore_poison()
            .shared
            .push_back(Scripted::Text(text.into()));
    }

    /// Get the call history.
    #[must_use]
    pub fn get_call_history(&self) -> Vec<MockCall> {
        self.call_history.lock_ignore_poison().clone()
    }

    /// Calls made with `model`.
    #[must_use]
    pub fn calls_for(&self, model: &str) -> Vec<MockCall> {
        self.call_history
            .lock_ignore_poison()
            .iter()
            .filter(|call| call.request.model == model)
            .cloned()
            .collect()
    }

    /// Get the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_history.lock_ignore_poison().len()
    }

    /// Number of queued replies not yet consumed.
    #[must_use]
    pub fn pending_replies(&self) -> usize {
        let script = self.script.lock_ignore_poison();
        script.shared.len() + script.by_model.values().map(VecDeque::len).sum::<usize>()
    }

    /// Records the call and picks its reply.
    fn answer(&self, request: &ChatRequest, json_mode: bool) -> Result<String> {
        request.validate()?;
        self.call_history.lock_ignore_poison().push(MockCall {
            request: request.clone(),
            json_mode,
        });

        let mut script = self.script.lock_ignore_poison();
        if let Some(scripted) = script
            .by_model
            .get_mut(&request.model)
            .and_then(VecDeque::pop_front)
        {
            return scripted.into_result();
        }
        if let Some(scripted) = script.shared.pop_front() {
            return scripted.into_result();
        }
        if let Some((_, text)) = script
            .patterns
            .iter()
            .find(|(pattern, _)| request.input.contains(pattern.as_str()))
        {
            return Ok(text.clone());
        }
        script.default_response.clone().ok_or_else(|| {
            Error::Provider(format!(
                "mock has no scripted reply for model '{}'",
                request.model
            ))
        })
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        self.answer(request, false)
    }

    async fn chat_json(&self, request: &ChatRequest) -> Result<String> {
        self.answer(request, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_model_queue_before_shared_queue() {
        let client = MockInferenceClient::new()
            .with_reply("shared")
            .with_model_reply("judge", "judged");

        let request = ChatRequest::new("judge", "plan");
        assert_eq!(client.chat(&request).await.unwrap(), "judged");
        assert_eq!(client.chat(&request).await.unwrap(), "shared");
        assert_eq!(client.call_count(), 2);
        assert_eq!(client.pending_replies(), 0);
    }

    #[tokio::test]
    async fn test_pattern_and_default() {
        let client = MockInferenceClient::new()
            .with_response("language", "bash")
            .with_default_response("fallback");

        let detect = ChatRequest::new("coder", "what language is this plan?");
        assert_eq!(client.chat(&detect).await.unwrap(), "bash");

        let other = ChatRequest::new("coder", "something else");
        assert_eq!(client.chat_json(&other).await.unwrap(), "fallback");

        let history = client.get_call_history();
        assert!(!history[0].json_mode);
        assert!(history[1].json_mode);
    }

    #[tokio::test]
    async fn test_unscripted_call_fails() {
        let client = MockInferenceClient::new();
        let result = client.chat(&ChatRequest::new("planner", "hello")).await;
        assert!(matches!(result, Err(Error::Provider(_))));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_input_is_not_recorded() {
        let client = MockInferenceClient::new().with_reply("unused");
        let result = client.chat(&ChatRequest::new("planner", "")).await;
        assert!(matches!(result, Err(Error::EmptyInput { field: "input" })));
        assert_eq!(client.call_count(), 0);
        assert_eq!(client.pending_replies(), 1);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let client = MockInferenceClient::new()
            .with_failure("service unavailable")
            .with_reply("ok");
        let request = ChatRequest::new("planner", "hello");
        assert!(client.chat(&request).await.is_err());
        assert_eq!(client.chat(&request).await.unwrap(), "ok");
    }
}
