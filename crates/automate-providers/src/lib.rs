//! Inference client adapters for OpenAI-compatible services.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

/// Scripted client for tests.
pub mod mock;
/// OpenAI-compatible chat completions client.
pub mod openai;

pub use mock::{MockCall, MockInferenceClient};
pub use openai::OpenAiClient;
