//! Core types and traits for the automation pipeline.
//!
//! This crate holds the data model shared by every other crate: plans and
//! their revision history, judge verdicts, generated artifacts, validation
//! reports, progress events, configuration, and the [`InferenceClient`]
//! abstraction over the language-model service.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        reason = "Allow for tests"
    )
)]

/// Generated code and validation reports.
pub mod artifact;
/// Configuration loading and environment overrides.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Supported automation languages.
pub mod language;
/// Plans, plan history, and judge verdicts.
pub mod plan;
/// Progress events and sinks.
pub mod progress;
/// Poison-tolerant locking.
pub mod sync;
/// Trait definitions for inference clients and structured responses.
pub mod traits;
/// Request types sent to the inference service.
pub mod types;

pub use artifact::{CodeArtifact, ValidationOutcome, ValidationReport};
pub use config::{
    AutomateConfig, InferenceConfig, KnowledgeConfig, ModelConfig, OrchestrationConfig,
    RetryConfig, ValidationConfig,
};
pub use error::{Error, Result, require_non_blank};
pub use language::Language;
pub use plan::{FeedbackBundle, Judgment, Plan, PlanHistory};
pub use progress::{ChannelSink, NoopSink, ProgressEvent, ProgressSink, Stage, TracingSink};
pub use sync::IgnoreLock;
pub use traits::{InferenceClient, StructuredResponse};
pub use types::{ChatRequest, ToolSpec};
