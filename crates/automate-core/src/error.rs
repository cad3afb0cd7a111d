use core::result::Result as CoreResult;
use std::io::Error as IoError;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for automation operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can end an automation run or one of its supporting steps.
#[derive(Debug, Error)]
pub enum Error {
    /// A required string argument was missing or blank.
    #[error("'{field}' is a required argument and cannot be empty")]
    EmptyInput {
        /// Name of the offending argument.
        field: &'static str,
    },

    /// Model output could not be coerced into the expected structure.
    #[error("model response could not be parsed after {attempts} attempt(s): {reason}")]
    MalformedResponse {
        /// Number of model calls made before giving up.
        attempts: usize,
        /// Parse or validation failure of the last attempt.
        reason: String,
    },

    /// The label generalizer exhausted its retry budget.
    #[error("unable to generate a parent taxonomy after {attempts} attempt(s): {reason}")]
    TaxonomyGenerationFailed {
        /// Number of model calls made before giving up.
        attempts: usize,
        /// Failure of the last attempt.
        reason: String,
    },

    /// A plan names a language with no registered generator or validator.
    #[error("unsupported automation language: {0}")]
    UnsupportedLanguage(String),

    /// A code generator returned no source text.
    #[error("code generation failed for {language}: {reason}")]
    GenerationFailed {
        /// Language tag of the generator that failed.
        language: String,
        /// Why the generator output was rejected.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// An HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The inference service returned an error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Required API key was not found.
    #[error("API key not found: {0}")]
    MissingApiKey(String),

    /// A progress sink could not deliver an event.
    #[error("progress sink error: {0}")]
    Sink(String),
}

impl Error {
    /// Determines whether asking the model again may fix this error.
    ///
    /// Input and configuration problems are never retryable: re-asking the
    /// model cannot repair a blank argument or an unknown language.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Request(_) | Self::Provider(_) | Self::MalformedResponse { .. }
        )
    }

    /// Returns a short, stable name for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput { .. } => "EmptyInput",
            Self::MalformedResponse { .. } => "MalformedResponse",
            Self::TaxonomyGenerationFailed { .. } => "TaxonomyGenerationFailed",
            Self::UnsupportedLanguage(_) => "UnsupportedLanguage",
            Self::GenerationFailed { .. } => "GenerationFailed",
            Self::Io(_) => "Io",
            Self::Request(_) => "Request",
            Self::Json(_) => "Json",
            Self::Toml(_) => "Toml",
            Self::Config(_) => "Config",
            Self::Provider(_) => "Provider",
            Self::MissingApiKey(_) => "MissingApiKey",
            Self::Sink(_) => "Sink",
        }
    }
}

/// Fails with [`Error::EmptyInput`] when `value` is missing or blank.
///
/// # Errors
/// Returns `EmptyInput` naming `field` if the value is blank.
pub fn require_non_blank(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::EmptyInput { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, from_str};
    use std::io;

    #[test]
    fn test_error_display() {
        let empty = Error::EmptyInput { field: "research" };
        assert_eq!(
            empty.to_string(),
            "'research' is a required argument and cannot be empty"
        );

        let language = Error::UnsupportedLanguage("java".to_owned());
        assert_eq!(language.to_string(), "unsupported automation language: java");

        let malformed = Error::MalformedResponse {
            attempts: 3,
            reason: "expected value".to_owned(),
        };
        assert!(malformed.to_string().contains("3 attempt(s)"));
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(Error::Provider("timeout".to_owned()).is_retryable());
        assert!(
            Error::MalformedResponse {
                attempts: 1,
                reason: String::new(),
            }
            .is_retryable()
        );

        assert!(!Error::EmptyInput { field: "plan" }.is_retryable());
        assert!(!Error::UnsupportedLanguage("cobol".to_owned()).is_retryable());
        assert!(!Error::Config("bad config".to_owned()).is_retryable());
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(Error::EmptyInput { field: "x" }.kind(), "EmptyInput");
        assert_eq!(
            Error::GenerationFailed {
                language: "bash".to_owned(),
                reason: "empty".to_owned(),
            }
            .kind(),
            "GenerationFailed"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = from_str::<JsonValue>("invalid json").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }

    #[test]
    fn test_require_non_blank() {
        require_non_blank("request", "restart httpd").unwrap();
        let error = require_non_blank("request", "   \n").unwrap_err();
        assert!(matches!(error, Error::EmptyInput { field: "request" }));
    }
}
