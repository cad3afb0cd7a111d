use std::env;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use automate_core::{ChatRequest, Error, InferenceClient, InferenceConfig, Result};

/// Env var key for the service API key.
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// Local servers such as Ollama accept unauthenticated requests, so the API
/// key is optional.
pub struct OpenAiClient {
    /// HTTP client for API requests.
    client: Client,
    /// Base URL without the trailing endpoint path.
    base_url: String,
    /// Bearer token, when the service requires one.
    api_key: Option<String>,
    /// Sampling temperature.
    temperature: f32,
    /// Maximum tokens per reply.
    max_output_tokens: u32,
}

impl OpenAiClient {
    /// Creates a client for `base_url` with default sampling settings.
    ///
    /// # Errors
    /// Returns `Error::Config` if the base URL is blank.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(&InferenceConfig {
            base_url: base_url.into(),
            ..InferenceConfig::default()
        })
    }

    /// Creates a client from configuration, falling back to `OPENAI_API_KEY`.
    ///
    /// # Errors
    /// Returns an error if the base URL is blank or the HTTP client cannot be built.
    pub fn from_config(config: &InferenceConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::Config(
                "inference.base_url cannot be empty".to_owned(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|err| Error::Provider(format!("Failed to build HTTP client: {err}")))?;

        let api_key = config
            .api_key
            .clone()
            .or_else(|| env::var(ENV_OPENAI_API_KEY).ok())
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Full URL of the completions endpoint.
    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Builds the request body for one call.
    fn build_body(&self, request: &ChatRequest, json_mode: bool) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(instructions) = request.effective_instructions() {
            messages.push(json!({ "role": "system", "content": instructions }));
        }
        messages.push(json!({ "role": "user", "content": request.input }));

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_output_tokens,
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": { "type": "object", "properties": {} },
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }

        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        body
    }

    /// Sends one completion request and returns the reply text.
    async fn complete(&self, request: &ChatRequest, json_mode: bool) -> Result<String> {
        request.validate()?;
        let start = Instant::now();
        let body = self.build_body(request, json_mode);

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| Error::Provider(format!("Request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Inference request failed with status {status}: {error_text}"
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|err| Error::Provider(format!("Failed to parse response: {err}")))?;

        let text = extract_text(completion)?;
        debug!(
            model = %request.model,
            json_mode,
            latency = ?start.elapsed(),
            chars = text.len(),
            "Inference call finished"
        );
        Ok(text)
    }
}

/// Pulls the reply text out of the first choice.
fn extract_text(completion: CompletionResponse) -> Result<String> {
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Provider("No choices in inference response".to_owned()))?;

    match choice.message.content {
        Some(content) => Ok(content),
        None if !choice.message.tool_calls.is_empty() => {
            let names: Vec<String> = choice
                .message
                .tool_calls
                .into_iter()
                .map(|call| call.function.name)
                .collect();
            Err(Error::Provider(format!(
                "Model requested tool calls that this client does not execute: {}",
                names.join(", ")
            )))
        }
        None => Err(Error::Provider(
            "Inference response carried no message content".to_owned(),
        )),
    }
}

/// Response payload of the completions endpoint.
#[derive(Deserialize)]
struct CompletionResponse {
    /// Generated choices.
    #[serde(default)]
    choices: Vec<Choice>,
}

/// One completion choice.
#[derive(Deserialize)]
struct Choice {
    /// Message payload.
    message: Message,
}

/// Assistant message.
#[derive(Deserialize)]
struct Message {
    /// Reply text; absent when the model only called tools.
    #[serde(default)]
    content: Option<String>,
    /// Tool calls requested by the model.
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

/// Tool call entry.
#[derive(Deserialize)]
struct ToolCall {
    /// Called function.
    function: FunctionCall,
}

/// Called function name.
#[derive(Deserialize)]
struct FunctionCall {
    /// Function name.
    name: String,
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        self.complete(request, false).await
    }

    async fn chat_json(&self, request: &ChatRequest) -> Result<String> {
        self.complete(request, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automate_core::ToolSpec;

    fn client() -> OpenAiClient {
        OpenAiClient::new("http://localhost:11434/v1/").unwrap()
    }

    #[test]
    fn test_blank_base_url_is_rejected() {
        let result = OpenAiClient::new("  ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            client().endpoint(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_body_plain_chat() {
        let request = ChatRequest::new("granite4", "write a plan").with_instructions("  ");
        let body = client().build_body(&request, false);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1, "blank instructions are dropped");
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "write a plan");
        assert!(body.get("response_format").is_none());
        assert!(body.get("tools").is_none());
        assert_eq!(body["max_tokens"], 2048);
    }

    #[test]
    fn test_body_json_mode_with_tools() {
        let request = ChatRequest::new("judge", "judge this")
            .with_instructions("You are a judge")
            .with_tools(vec![ToolSpec::new("research_request", "Research")]);
        let body = client().build_body(&request, true);

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["tools"][0]["function"]["name"], "research_request");
    }

    #[tokio::test]
    async fn test_blank_input_fails_before_network() {
        let request = ChatRequest::new("granite4", "   ");
        match client().chat(&request).await {
            Err(Error::EmptyInput { field }) => assert_eq!(field, "input"),
            other => panic!("expected EmptyInput, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_text_variants() {
        let completion: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hello"}}]}"#).unwrap();
        assert_eq!(extract_text(completion).unwrap(), "hello");

        let completion: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_text(completion), Err(Error::Provider(_))));

        let completion: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":null,"tool_calls":[{"function":{"name":"validate_code"}}]}}]}"#,
        )
        .unwrap();
        match extract_text(completion) {
            Err(Error::Provider(message)) => assert!(message.contains("validate_code")),
            other => panic!("expected provider error, got {other:?}"),
        }
    }
}
