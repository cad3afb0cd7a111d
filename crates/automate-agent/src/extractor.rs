//! Coerces free-form model text into typed records.
//!
//! Models wrap JSON in code fences, prefix it with reasoning traces or tag
//! it with a language name. [`strip_wrappers`] peels those layers off until
//! the text stops changing; [`Extractor`] asks again when parsing still
//! fails, since a fresh generation is more likely to succeed than re-reading
//! the same malformed text.

use core::result::Result as CoreResult;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, warn};

use automate_core::{ChatRequest, Error, InferenceClient, Result, StructuredResponse};

/// Default number of model calls per extraction.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Reasoning trace emitted before the final answer, e.g. `analysis ... final{`.
static ANALYSIS_TRACE: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"(?is)^analysis.*?final\s*([\{\[])") {
        Ok(regex) => regex,
        Err(err) => panic!("Analysis trace regex is invalid: {err}"),
    });

/// `<think>...</think>` reasoning blocks.
static THINK_BLOCK: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"(?is)<think>.*?</think>") {
    Ok(regex) => regex,
    Err(err) => panic!("Think block regex is invalid: {err}"),
});

/// Strips a case-insensitive ASCII prefix.
fn strip_prefix_ignore_case<'text>(text: &'text str, prefix: &str) -> Option<&'text str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}

/// Removes wrapper tokens around a JSON payload, repeating until stable.
pub fn strip_wrappers(raw: &str) -> String {
    let mut current = THINK_BLOCK.replace_all(raw, "").trim().to_owned();
    loop {
        let mut next = ANALYSIS_TRACE.replace(&current, "$1").trim().to_owned();
        for prefix in ["```", "final", "json"] {
            if let Some(rest) = strip_prefix_ignore_case(&next, prefix) {
                next = rest.trim().to_owned();
            }
        }
        if let Some(rest) = next.strip_suffix("```") {
            next = rest.trim().to_owned();
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Parses already-stripped text into `T` and runs its cross-field check.
pub fn parse_structured<T: StructuredResponse>(text: &str) -> CoreResult<T, String> {
    let parsed: T = serde_json::from_str(text).map_err(|err| err.to_string())?;
    parsed.check()?;
    Ok(parsed)
}

/// Why one attempt failed.
enum Failure {
    /// The service call failed with a retryable error.
    Transport(Error),
    /// The reply did not parse or failed its check.
    Parse(String),
}

/// Structured response extractor with a bounded retry budget.
#[derive(Clone)]
pub struct Extractor {
    /// Inference client used for JSON-biased calls.
    client: Arc<dyn InferenceClient>,
    /// Model calls allowed per extraction.
    max_attempts: usize,
}

impl Extractor {
    /// Creates an extractor with the default budget.
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            client,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets the retry budget; zero is raised to one.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Retry budget in model calls.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Asks the model for a `T`, retrying malformed replies.
    ///
    /// # Errors
    /// Returns `EmptyInput` immediately for a blank input or model, a
    /// non-retryable provider error as-is, and `MalformedResponse` once the
    /// budget is exhausted.
    pub async fn extract<T: StructuredResponse>(&self, request: &ChatRequest) -> Result<T> {
        request.validate()?;

        let mut last_failure = None;
        for attempt in 1..=self.max_attempts {
            let raw = match self.client.chat_json(request).await {
                Ok(raw) => raw,
                Err(err) if err.is_retryable() => {
                    warn!(attempt, model = %request.model, "Inference call failed, retrying: {err}");
                    last_failure = Some(Failure::Transport(err));
                    continue;
                }
                Err(err) => return Err(err),
            };
            debug!(attempt, "Raw structured response: {raw}");

            let cleaned = strip_wrappers(&raw);
            match parse_structured::<T>(&cleaned) {
                Ok(parsed) => return Ok(parsed),
                Err(reason) => {
                    warn!(attempt, "Model returned malformed JSON, retrying: {reason}");
                    last_failure = Some(Failure::Parse(reason));
                }
            }
        }

        match last_failure {
            Some(Failure::Transport(err)) => {
                error!(attempts = self.max_attempts, "Inference service kept failing: {err}");
                Err(err)
            }
            Some(Failure::Parse(reason)) => {
                error!(attempts = self.max_attempts, "Unable to parse model response: {reason}");
                Err(Error::MalformedResponse {
                    attempts: self.max_attempts,
                    reason,
                })
            }
            None => Err(Error::MalformedResponse {
                attempts: 0,
                reason: "no attempt was made".to_owned(),
            }),
        }
    }

    /// Asks the model for any JSON value.
    ///
    /// # Errors
    /// Same as [`Extractor::extract`].
    pub async fn extract_value(&self, request: &ChatRequest) -> Result<Value> {
        self.extract::<Value>(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fence_with_json_tag() {
        let wrapped = "```json\n{\"revise_plan_flag\": false, \"feedback\": []}\n```";
        assert_eq!(
            strip_wrappers(wrapped),
            "{\"revise_plan_flag\": false, \"feedback\": []}"
        );
    }

    #[test]
    fn test_strip_analysis_trace() {
        let wrapped = "analysis The user wants JSON. assistantfinal{\"a\": 1}";
        assert_eq!(strip_wrappers(wrapped), "{\"a\": 1}");

        let wrapped = "ANALYSIS thinking...\nfinal [1, 2]";
        assert_eq!(strip_wrappers(wrapped), "[1, 2]");
    }

    #[test]
    fn test_strip_think_block_and_nested_layers() {
        let wrapped = "<think>hmm, fences?</think>\n```\nfinal\n```json\n{\"a\": 1}\n```\n```";
        assert_eq!(strip_wrappers(wrapped), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let plain = "{\"a\": [1, 2, 3]}";
        assert_eq!(strip_wrappers(plain), plain);
        assert_eq!(strip_wrappers(&strip_wrappers(plain)), plain);
    }

    #[test]
    fn test_wrapped_and_bare_parse_identically() {
        let bare: Value = parse_structured(&strip_wrappers("{\"x\": true}")).unwrap();
        let wrapped: Value =
            parse_structured(&strip_wrappers("```json\n{\"x\": true}\n```")).unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare, json!({"x": true}));
    }

    #[test]
    fn test_prefix_match_is_ascii_case_insensitive() {
        assert_eq!(strip_prefix_ignore_case("JSON{}", "json"), Some("{}"));
        assert_eq!(strip_prefix_ignore_case("js", "json"), None);
        assert_eq!(strip_prefix_ignore_case("ünïcode", "json"), None);
    }
}
