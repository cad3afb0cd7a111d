//! Capabilities exposed as named, string-in/string-out tools.
//!
//! Tool results may cross a process boundary, so failures are returned as
//! `ERROR: ...` strings instead of errors.

use std::str::FromStr as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{error, info};

use automate_core::{AutomateConfig, Error, InferenceClient, Language, Result, ToolSpec};

use crate::capabilities::{PlanJudge, PlanReviser, Planner};
use crate::generator::{CodeGenerator, ModelCodeGenerator};
use crate::research::{KnowledgeResearcher, Researcher};
use crate::validator::{StaticAnalysisValidator, Validator};

/// Named string arguments of one tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    /// Raw JSON object.
    values: Map<String, Value>,
}

impl ToolArgs {
    /// Wraps a JSON object.
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Builds arguments from `(name, value)` pairs.
    pub fn from_pairs<'pair, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'pair str, &'pair str)>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(name, value)| (name.to_owned(), Value::String(value.to_owned())))
                .collect(),
        }
    }

    /// Returns a non-blank string argument.
    ///
    /// # Errors
    /// Returns `EmptyInput` naming `name` when it is missing, not a string,
    /// or blank.
    pub fn require(&self, name: &'static str) -> Result<&str> {
        match self.values.get(name).and_then(Value::as_str) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(Error::EmptyInput { field: name }),
        }
    }
}

/// One capability callable by name.
#[async_trait]
pub trait CapabilityTool: Send + Sync {
    /// Returns the unique identifier for this tool.
    fn name(&self) -> &'static str;

    /// Returns what the tool does.
    fn description(&self) -> &'static str;

    /// Required argument names, checked in order before invocation.
    fn arguments(&self) -> &'static [&'static str];

    /// Runs the capability.
    ///
    /// # Errors
    /// Returns the capability's error; the registry renders it as text.
    async fn invoke(&self, args: &ToolArgs) -> Result<String>;
}

/// Tool wrapping the researcher.
pub struct ResearchRequestTool {
    /// Research source.
    researcher: Arc<dyn Researcher>,
}

impl ResearchRequestTool {
    /// Creates the tool.
    pub fn new(researcher: Arc<dyn Researcher>) -> Self {
        Self { researcher }
    }
}

#[async_trait]
impl CapabilityTool for ResearchRequestTool {
    fn name(&self) -> &'static str {
        "research_request"
    }

    fn description(&self) -> &'static str {
        "Gathers environmental context such as system types, software versions and standards for an automation request."
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["user_request"]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        self.researcher.research(args.require("user_request")?).await
    }
}

/// Tool wrapping the planner.
pub struct CreatePlanTool {
    /// Planner.
    planner: Arc<Planner>,
}

impl CreatePlanTool {
    /// Creates the tool.
    pub fn new(planner: Arc<Planner>) -> Self {
        Self { planner }
    }
}

#[async_trait]
impl CapabilityTool for CreatePlanTool {
    fn name(&self) -> &'static str {
        "create_plan"
    }

    fn description(&self) -> &'static str {
        "Creates an implementation plan for an automation request from the request and its research."
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["user_request", "research"]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        self.planner
            .create_plan(args.require("user_request")?, args.require("research")?)
            .await
    }
}

/// Tool wrapping the judge; answers with the verdict as JSON.
pub struct JudgePlanTool {
    /// Judge.
    judge: Arc<PlanJudge>,
}

impl JudgePlanTool {
    /// Creates the tool.
    pub fn new(judge: Arc<PlanJudge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl CapabilityTool for JudgePlanTool {
    fn name(&self) -> &'static str {
        "judge_plan"
    }

    fn description(&self) -> &'static str {
        "Reviews a nominated implementation plan and returns a revise flag with itemised feedback."
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["user_request", "research", "nominated_plan"]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        let judgment = self
            .judge
            .judge(
                args.require("user_request")?,
                args.require("research")?,
                args.require("nominated_plan")?,
            )
            .await?;
        let wire = json!({
            "revise_plan_flag": judgment.needs_revision,
            "feedback": judgment.feedback,
        });
        Ok(serde_json::to_string(&wire)?)
    }
}

/// Tool wrapping the reviser.
pub struct RevisePlanTool {
    /// Reviser.
    reviser: Arc<PlanReviser>,
}

impl RevisePlanTool {
    /// Creates the tool.
    pub fn new(reviser: Arc<PlanReviser>) -> Self {
        Self { reviser }
    }
}

#[async_trait]
impl CapabilityTool for RevisePlanTool {
    fn name(&self) -> &'static str {
        "revise_plan"
    }

    fn description(&self) -> &'static str {
        "Revises an implementation plan to address specific judge feedback."
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["feedback", "plan"]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        self.reviser
            .revise(args.require("feedback")?, args.require("plan")?)
            .await
    }
}

/// Tool wrapping one language's code generator; answers with the source.
pub struct WriteCodeTool {
    /// Generator.
    generator: Arc<dyn CodeGenerator>,
}

impl WriteCodeTool {
    /// Creates the tool.
    pub fn new(generator: Arc<dyn CodeGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl CapabilityTool for WriteCodeTool {
    fn name(&self) -> &'static str {
        match self.generator.language() {
            Language::Ansible => "write_ansible_playbook",
            Language::Bash => "write_bash_script",
            Language::PowerShell => "write_powershell_script",
        }
    }

    fn description(&self) -> &'static str {
        match self.generator.language() {
            Language::Ansible => "Writes an Ansible playbook implementing an implementation plan.",
            Language::Bash => "Writes a Bash script implementing an implementation plan.",
            Language::PowerShell => "Writes a PowerShell script implementing an implementation plan.",
        }
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["plan"]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        Ok(self.generator.generate(args.require("plan")?).await?.source)
    }
}

/// Tool wrapping the validator; answers with the report text.
pub struct ValidateCodeTool {
    /// Validator.
    validator: Arc<dyn Validator>,
}

impl ValidateCodeTool {
    /// Creates the tool.
    pub fn new(validator: Arc<dyn Validator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl CapabilityTool for ValidateCodeTool {
    fn name(&self) -> &'static str {
        "validate_code"
    }

    fn description(&self) -> &'static str {
        "Runs the language's static analysis tool on source code and returns its report."
    }

    fn arguments(&self) -> &'static [&'static str] {
        &["language", "source_code"]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<String> {
        let language = Language::from_str(args.require("language")?)?;
        let report = self
            .validator
            .validate(language, args.require("source_code")?)
            .await?;
        Ok(report.text)
    }
}

/// Tool list shared by clones.
type ToolList = Arc<Vec<Arc<dyn CapabilityTool>>>;

/// Registry of capability tools.
#[derive(Clone)]
pub struct ToolRegistry {
    /// Registered tools.
    tools: ToolList,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: Arc::new(Vec::new()),
        }
    }

    /// Add a tool to the registry
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn CapabilityTool>) -> Self {
        Arc::make_mut(&mut self.tools).push(tool);
        self
    }

    /// Registers every capability backed by `client` and `config`.
    ///
    /// # Errors
    /// Returns a configuration error when the knowledge repository client
    /// cannot be built.
    pub fn standard(client: &Arc<dyn InferenceClient>, config: &AutomateConfig) -> Result<Self> {
        let researcher = KnowledgeResearcher::from_config(&config.knowledge)?;
        let registry = Self::new()
            .with_tool(Arc::new(ResearchRequestTool::new(Arc::new(researcher))))
            .with_tool(Arc::new(CreatePlanTool::new(Arc::new(Planner::new(
                Arc::clone(client),
                config,
            )))))
            .with_tool(Arc::new(JudgePlanTool::new(Arc::new(PlanJudge::new(
                Arc::clone(client),
                config,
            )))))
            .with_tool(Arc::new(RevisePlanTool::new(Arc::new(PlanReviser::new(
                Arc::clone(client),
                config,
            )))));
        let registry = ModelCodeGenerator::for_all_languages(client, config)
            .into_iter()
            .fold(registry, |registry, generator| {
                registry.with_tool(Arc::new(WriteCodeTool::new(generator)))
            });
        Ok(registry.with_tool(Arc::new(ValidateCodeTool::new(Arc::new(
            StaticAnalysisValidator::from_config(&config.validation),
        )))))
    }

    /// Get a tool by name, if it exists
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn CapabilityTool>> {
        self.tools.iter().find(|tool| tool.name() == name).cloned()
    }

    /// List all available tools
    #[must_use]
    pub fn list_tools(&self) -> Vec<&dyn CapabilityTool> {
        self.tools.iter().map(|tool| &**tool).collect()
    }

    /// Tool descriptions for a chat request.
    #[must_use]
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|tool| ToolSpec::new(tool.name(), tool.description()))
            .collect()
    }

    /// Get number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Calls `name` with a JSON object of string arguments.
    ///
    /// Never fails: problems are returned as `ERROR: ...` text.
    pub async fn call(&self, name: &str, input: &Value) -> String {
        let Some(tool) = self.get_tool(name) else {
            return error_text(&format!("unknown tool '{name}'"));
        };
        let Some(object) = input.as_object() else {
            return error_text("tool input must be a JSON object of named string arguments");
        };

        let args = ToolArgs::new(object.clone());
        if let Some(err) = tool
            .arguments()
            .iter()
            .find_map(|argument| args.require(argument).err())
        {
            return error_text(&err.to_string());
        }

        info!(tool = name, "Invoking capability tool");
        match tool.invoke(&args).await {
            Ok(result) => result,
            Err(err) => error_text(&err.to_string()),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs and renders a failure.
fn error_text(message: &str) -> String {
    let text = format!("ERROR: {message}");
    error!("{text}");
    text
}
