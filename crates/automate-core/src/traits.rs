use core::result::Result as CoreResult;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{ChatRequest, Result};

/// Blocking request/response access to a language-model service.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Returns the unique identifier for this client.
    fn name(&self) -> &'static str;

    /// Sends instructions and input, returning the model's plain text.
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` for a blank input or model, or a provider error
    /// if the service call fails.
    async fn chat(&self, request: &ChatRequest) -> Result<String>;

    /// Same as [`InferenceClient::chat`] but biases the model towards a JSON reply.
    ///
    /// The text is returned unparsed; callers own parsing and repair.
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` for a blank input or model, or a provider error
    /// if the service call fails.
    async fn chat_json(&self, request: &ChatRequest) -> Result<String>;
}

/// A typed record the model is asked to produce.
///
/// Field presence is enforced by deserialization; `check` enforces rules
/// spanning several fields. A failed check counts as a malformed attempt.
pub trait StructuredResponse: DeserializeOwned {
    /// Validates the parsed record.
    ///
    /// # Errors
    /// Returns a description of the violated rule.
    fn check(&self) -> CoreResult<(), String> {
        Ok(())
    }
}

impl StructuredResponse for serde_json::Value {}
