//! Plan refinement state machine driving one automation run.
//!
//! Research, planning and the judge/revise loop run strictly in sequence.
//! The loop stops when the judge accepts the plan or after `max_cycles`
//! revisions, whichever comes first; the last plan is used either way.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use automate_core::{
    AutomateConfig, CodeArtifact, FeedbackBundle, InferenceClient, PlanHistory,
    ProgressEvent, ProgressSink, Result, Stage, TracingSink, ValidationReport, require_non_blank,
};

use crate::capabilities::{PlanJudge, PlanReviser, Planner};
use crate::research::{KnowledgeResearcher, Researcher};
use crate::router::CodeRouter;
use crate::validator::{StaticAnalysisValidator, Validator};

/// How the judge/revise loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTermination {
    /// The judge accepted the current plan.
    Accepted,
    /// The revision cap was hit; the last revision was not re-judged.
    CycleLimitReached,
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Original request.
    pub request: String,
    /// Research used for planning and judging.
    pub research: String,
    /// Every plan version; the last one was used for generation.
    pub history: PlanHistory,
    /// Generated code.
    pub artifact: CodeArtifact,
    /// Advisory static analysis report.
    pub report: ValidationReport,
    /// How the refinement loop ended.
    pub termination: RunTermination,
}

/// Drives a request from research to a validated artifact.
pub struct PlanRefinementOrchestrator {
    /// Research source.
    researcher: Arc<dyn Researcher>,
    /// Writes the first plan.
    planner: Planner,
    /// Reviews plans.
    judge: PlanJudge,
    /// Applies feedback.
    reviser: PlanReviser,
    /// Dispatches the final plan.
    router: CodeRouter,
    /// Static analysis.
    validator: Arc<dyn Validator>,
    /// Progress observer.
    sink: Arc<dyn ProgressSink>,
    /// Maximum number of revisions.
    max_cycles: usize,
}

impl PlanRefinementOrchestrator {
    /// Creates an orchestrator with the configured knowledge repository,
    /// static analysis tools and a logging progress sink.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid `config`.
    pub fn new(client: Arc<dyn InferenceClient>, config: &AutomateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            researcher: Arc::new(KnowledgeResearcher::from_config(&config.knowledge)?),
            planner: Planner::new(Arc::clone(&client), config),
            judge: PlanJudge::new(Arc::clone(&client), config),
            reviser: PlanReviser::new(Arc::clone(&client), config),
            router: CodeRouter::from_config(&client, config),
            validator: Arc::new(StaticAnalysisValidator::from_config(&config.validation)),
            sink: Arc::new(TracingSink),
            max_cycles: config.orchestration.max_cycles,
        })
    }

    /// Replaces the research source.
    #[must_use]
    pub fn with_researcher(mut self, researcher: Arc<dyn Researcher>) -> Self {
        self.researcher = researcher;
        self
    }

    /// Replaces the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Replaces the progress sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the code router.
    #[must_use]
    pub fn with_router(mut self, router: CodeRouter) -> Self {
        self.router = router;
        self
    }

    /// Overrides the revision cap.
    #[must_use]
    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Delivers an event; a failed delivery is logged and otherwise ignored.
    fn emit(&self, event: ProgressEvent) {
        if let Err(err) = self.sink.report(event) {
            warn!("Progress event dropped: {err}");
        }
    }

    /// Announces a stage.
    fn enter(&self, stage: Stage) {
        self.emit(ProgressEvent::StageStarted { stage });
    }

    /// Runs the full pipeline for `request`.
    ///
    /// # Errors
    /// Returns `EmptyInput` for a blank request, and propagates research,
    /// planning, judging, revision and generation failures. Validation
    /// problems never fail the run.
    pub async fn run(&self, request: &str) -> Result<RunOutcome> {
        require_non_blank("user_request", request)?;
        let started = Instant::now();

        self.enter(Stage::Researching);
        let research = self.researcher.research(request).await?;
        require_non_blank("research", &research)?;
        self.emit(ProgressEvent::ResearchComplete {
            research: research.clone(),
        });

        self.enter(Stage::Planning);
        let mut history = PlanHistory::new(self.planner.create_plan(request, &research).await?);
        let current = history.current();
        self.emit(ProgressEvent::PlanCreated {
            plan: current.clone(),
            language: current.declared_language().ok().flatten(),
        });

        let termination = self.refine(request, &research, &mut history).await?;

        self.enter(Stage::Generating);
        let artifact = self.router.route(history.current()).await?;
        self.emit(ProgressEvent::CodeGenerated {
            artifact: artifact.clone(),
        });

        self.enter(Stage::Validating);
        let report = self.validate(&artifact).await;
        self.emit(ProgressEvent::Validated {
            report: report.clone(),
        });

        self.enter(Stage::Done);
        self.emit(ProgressEvent::Completed);
        info!(
            revisions = history.revision_count(),
            filename = %artifact.filename,
            elapsed = ?started.elapsed(),
            "Automation run completed"
        );

        Ok(RunOutcome {
            request: request.to_owned(),
            research,
            history,
            artifact,
            report,
            termination,
        })
    }

    /// Judge/revise loop. Each judge call is followed by at most one
    /// revision; the plan produced by the final permitted revision is kept
    /// without another verdict.
    async fn refine(
        &self,
        request: &str,
        research: &str,
        history: &mut PlanHistory,
    ) -> Result<RunTermination> {
        let mut revisions = 0;
        loop {
            if revisions >= self.max_cycles {
                warn!(revisions, "Correction cycle limit reached");
                self.emit(ProgressEvent::CycleLimitReached { revisions });
                return Ok(RunTermination::CycleLimitReached);
            }

            self.enter(Stage::Judging);
            let judgment = self
                .judge
                .judge(request, research, &history.current().text)
                .await?;
            self.emit(ProgressEvent::PlanJudged {
                cycle: revisions + 1,
                judgment: judgment.clone(),
            });

            if !judgment.needs_revision {
                self.emit(ProgressEvent::PlanAccepted { revisions });
                return Ok(RunTermination::Accepted);
            }

            self.enter(Stage::Revising);
            let feedback = FeedbackBundle::from_judgment(&judgment);
            let revised = self
                .reviser
                .revise_plan(feedback.as_str(), history.current())
                .await?;
            revisions += 1;
            let plan = history.revise(revised).clone();
            self.emit(ProgressEvent::PlanRevised {
                cycle: revisions,
                plan,
            });
        }
    }

    /// Runs static analysis, downgrading failures to an advisory report.
    async fn validate(&self, artifact: &CodeArtifact) -> ValidationReport {
        match self.validator.validate_artifact(artifact).await {
            Ok(report) => report,
            Err(err) => {
                error!("Validation of {} failed: {err}", artifact.filename);
                ValidationReport::could_not_validate(artifact.language.tag(), err)
            }
        }
    }
}
