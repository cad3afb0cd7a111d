use serde::{Deserialize, Serialize};

use crate::{Result, require_non_blank};

/// A tool the model may call while answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name as registered with the tool server.
    pub name: String,
    /// What the tool does, shown to the model.
    pub description: String,
}

impl ToolSpec {
    /// Creates a tool description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// One (instructions, input, model, tools) request to the inference service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Optional system instructions.
    pub instructions: Option<String>,
    /// Required user input.
    pub input: String,
    /// Required model name.
    pub model: String,
    /// Tools offered to the model; empty for plain chat.
    pub tools: Vec<ToolSpec>,
}

impl ChatRequest {
    /// Creates a request without instructions or tools.
    pub fn new(model: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            instructions: None,
            input: input.into(),
            model: model.into(),
            tools: Vec::new(),
        }
    }

    /// Sets the system instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Sets the tool list.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// System instructions, with blank instructions treated as absent.
    #[must_use]
    pub fn effective_instructions(&self) -> Option<&str> {
        self.instructions
            .as_deref()
            .filter(|instructions| !instructions.trim().is_empty())
    }

    /// Checks the required fields before any network I/O.
    ///
    /// # Errors
    /// Returns `EmptyInput` naming the first blank required field.
    pub fn validate(&self) -> Result<()> {
        require_non_blank("input", &self.input)?;
        require_non_blank("model", &self.model)
    }
}
