//! Plan refinement and code generation for infrastructure automation.
//!
//! A request is researched, planned, judged and revised a bounded number of
//! times, then routed to the generator for the plan's declared language and
//! checked with that language's static analysis tool. Each step is also
//! available as a named tool through [`ToolRegistry`]. Incident records can
//! be classified and rolled up into a parent taxonomy with
//! [`IncidentCategorizer`].
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::tests_outside_test_module,
        clippy::min_ident_chars,
        clippy::indexing_slicing,
        reason = "Allow for tests"
    )
)]

pub mod capabilities;
pub mod classifier;
pub mod extractor;
pub mod generator;
pub mod orchestrator;
pub mod prompts;
pub mod research;
pub mod router;
pub mod taxonomy;
pub mod tools;
pub mod validator;

pub use capabilities::{PlanJudge, PlanReviser, Planner};
pub use classifier::{
    CategorizedIncident, ClassifiedIncident, IncidentAnalysis, IncidentCategorizer,
    IncidentClassifier,
};
pub use extractor::{Extractor, parse_structured, strip_wrappers};
pub use generator::{CodeGenerator, GeneratedCode, ModelCodeGenerator};
pub use orchestrator::{PlanRefinementOrchestrator, RunOutcome, RunTermination};
pub use research::{KnowledgeResearcher, NO_CONTEXT_WARNING, Researcher, StaticResearch};
pub use router::CodeRouter;
pub use taxonomy::{CategoryGroup, LabelGeneralizer, LabelMapping, UNSPECIFIED};
pub use tools::{CapabilityTool, ToolArgs, ToolRegistry};
pub use validator::{LintTool, StaticAnalysisValidator, Validator};
