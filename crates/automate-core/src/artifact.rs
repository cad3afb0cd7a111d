//! Terminal outputs of a run: the generated code and its validation report.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::Language;

/// Generated automation source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    /// Language of the source; always the plan's declared language.
    pub language: Language,
    /// Generator-chosen filename including extension.
    pub filename: String,
    /// Full source text, never empty.
    pub source: String,
}

/// How a validation attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    /// The tool ran and reported nothing.
    Clean,
    /// The tool ran and reported issues.
    Findings,
    /// The tool binary is not installed.
    ToolUnavailable,
    /// Validation could not be completed (timeout, unexpected failure).
    Unvalidated,
}

/// Advisory result of static analysis. Never blocks artifact delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Outcome class.
    pub outcome: ValidationOutcome,
    /// Name of the static-analysis tool involved.
    pub tool: String,
    /// Report text shown to the operator.
    pub text: String,
}

impl ValidationReport {
    /// The tool ran cleanly.
    pub fn clean(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        let text = format!("{tool}: no issues found");
        Self {
            outcome: ValidationOutcome::Clean,
            tool,
            text,
        }
    }

    /// The tool reported findings.
    pub fn findings(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            outcome: ValidationOutcome::Findings,
            tool: tool.into(),
            text: output.into(),
        }
    }

    /// The tool binary was not found.
    pub fn tool_unavailable(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        let text = format!("{tool} not found: unable to validate the generated code");
        Self {
            outcome: ValidationOutcome::ToolUnavailable,
            tool,
            text,
        }
    }

    /// Validation failed for a reason other than a missing tool.
    pub fn could_not_validate(tool: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            outcome: ValidationOutcome::Unvalidated,
            tool: tool.into(),
            text: format!("could not validate: {reason}"),
        }
    }

    /// Whether the tool actually ran to completion.
    pub fn tool_ran(&self) -> bool {
        matches!(
            self.outcome,
            ValidationOutcome::Clean | ValidationOutcome::Findings
        )
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_constructors() {
        let missing = ValidationReport::tool_unavailable("shellcheck");
        assert_eq!(missing.outcome, ValidationOutcome::ToolUnavailable);
        assert!(missing.text.contains("not found"));
        assert!(!missing.tool_ran());

        let clean = ValidationReport::clean("ansible-lint");
        assert!(clean.tool_ran());
        assert_eq!(clean.to_string(), "ansible-lint: no issues found");

        let advisory = ValidationReport::could_not_validate("pwsh", "timed out after 5s");
        assert_eq!(advisory.text, "could not validate: timed out after 5s");
    }
}
