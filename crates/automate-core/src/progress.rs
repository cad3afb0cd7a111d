//! Progress events emitted by the orchestrator and the sinks that receive them.

use core::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::{CodeArtifact, Error, Judgment, Language, Plan, Result, ValidationReport};

/// States of the plan refinement state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Gathering environmental context.
    Researching,
    /// Producing the first plan.
    Planning,
    /// Asking the judge for a verdict.
    Judging,
    /// Applying judge feedback to the plan.
    Revising,
    /// Routing the final plan to a code generator.
    Generating,
    /// Running static analysis on the artifact.
    Validating,
    /// Terminal state.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Researching => "researching",
            Self::Planning => "planning",
            Self::Judging => "judging",
            Self::Revising => "revising",
            Self::Generating => "generating",
            Self::Validating => "validating",
            Self::Done => "done",
        };
        formatter.write_str(name)
    }
}

/// An observable step of one automation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// A stage has started.
    StageStarted {
        /// Stage being entered.
        stage: Stage,
    },
    /// Research is available.
    ResearchComplete {
        /// Research text.
        research: String,
    },
    /// The planning stage produced the first plan.
    PlanCreated {
        /// The new plan.
        plan: Plan,
        /// Declared language, when the plan carries a valid declaration.
        language: Option<Language>,
    },
    /// The judge returned a verdict.
    PlanJudged {
        /// 1-based judge invocation number.
        cycle: usize,
        /// The verdict.
        judgment: Judgment,
    },
    /// A revision replaced the current plan.
    PlanRevised {
        /// 1-based revision number.
        cycle: usize,
        /// The revised plan.
        plan: Plan,
    },
    /// The judge accepted the plan.
    PlanAccepted {
        /// Revisions applied before acceptance.
        revisions: usize,
    },
    /// The cycle cap was reached; generation proceeds with the last plan.
    CycleLimitReached {
        /// Revisions applied, equal to the cap.
        revisions: usize,
    },
    /// Code was generated.
    CodeGenerated {
        /// The artifact.
        artifact: CodeArtifact,
    },
    /// Static analysis finished (or was downgraded to an advisory report).
    Validated {
        /// The report.
        report: ValidationReport,
    },
    /// The run finished with a delivered artifact.
    Completed,
}

impl ProgressEvent {
    /// Human-readable status line for the event.
    pub fn status(&self) -> String {
        match self {
            Self::StageStarted { stage } => match stage {
                Stage::Researching => "Researching request...".to_owned(),
                Stage::Planning => "Research complete.  Creating implementation plan...".to_owned(),
                Stage::Judging => "Obtaining a peer review from a judge...".to_owned(),
                Stage::Revising => {
                    "Received negative feedback on plan from judge.  Modifying plan...".to_owned()
                }
                Stage::Generating => {
                    "Writing script based on the final implementation plan...".to_owned()
                }
                Stage::Validating => {
                    "Performing a code review of the generated source code...".to_owned()
                }
                Stage::Done => "Done.".to_owned(),
            },
            Self::ResearchComplete { .. } => "Research gathered.".to_owned(),
            Self::PlanCreated { plan, language } => match language {
                Some(language) => {
                    format!("Implementation plan v{} created ({language}).", plan.version)
                }
                None => format!("Implementation plan v{} created.", plan.version),
            },
            Self::PlanJudged { cycle, judgment } => {
                let verdict = if judgment.needs_revision {
                    "revisions required"
                } else {
                    "quality plan"
                };
                format!("Judge verdict #{cycle}: {verdict}.")
            }
            Self::PlanRevised { cycle, plan } => {
                format!("Plan revised (cycle #{cycle}, now v{}).", plan.version)
            }
            Self::PlanAccepted { revisions } => {
                format!("Plan accepted by judge after {revisions} revision(s).")
            }
            Self::CycleLimitReached { revisions } => format!(
                "Correction cycle limit reached after {revisions} revision(s); continuing with the last plan."
            ),
            Self::CodeGenerated { artifact } => {
                format!("Generated {} ({}).", artifact.filename, artifact.language)
            }
            Self::Validated { report } => format!("Validation finished: {:?}.", report.outcome),
            Self::Completed => "Completed Successfully!".to_owned(),
        }
    }
}

/// Receiver of progress events.
///
/// Implementations must not block. A failed delivery is returned to the
/// caller, which logs it and carries on with the run.
pub trait ProgressSink: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    /// Returns `Error::Sink` when the event could not be delivered.
    fn report(&self, event: ProgressEvent) -> Result<()>;
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn report(&self, _event: ProgressEvent) -> Result<()> {
        Ok(())
    }
}

/// Sink that logs every event's status line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn report(&self, event: ProgressEvent) -> Result<()> {
        info!(target: "automate::progress", "{}", event.status());
        Ok(())
    }
}

/// Sink forwarding events over an unbounded channel.
#[derive(Clone)]
pub struct ChannelSink {
    /// Sender used to deliver events to the consumer.
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that consumes its events.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Creates a sink from an existing sender.
    pub fn from_sender(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, event: ProgressEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|error| Error::Sink(format!("receiver closed: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_events() {
        let (sink, mut receiver) = ChannelSink::channel();
        sink.report(ProgressEvent::StageStarted {
            stage: Stage::Researching,
        })
        .unwrap();
        sink.report(ProgressEvent::Completed).unwrap();

        assert_eq!(
            receiver.recv().await,
            Some(ProgressEvent::StageStarted {
                stage: Stage::Researching
            })
        );
        assert_eq!(receiver.recv().await, Some(ProgressEvent::Completed));
    }

    #[test]
    fn test_channel_sink_reports_dropped_receiver() {
        let (sink, receiver) = ChannelSink::channel();
        drop(receiver);
        let error = sink.report(ProgressEvent::Completed).unwrap_err();
        assert!(matches!(error, Error::Sink(_)));
        assert_eq!(error.kind(), "Sink");
    }

    #[test]
    fn test_noop_and_tracing_sinks_accept_events() {
        NoopSink.report(ProgressEvent::Completed).unwrap();
        TracingSink
            .report(ProgressEvent::PlanAccepted { revisions: 0 })
            .unwrap();
    }

    #[test]
    fn test_terminal_paths_are_distinguishable() {
        let accepted = ProgressEvent::PlanAccepted { revisions: 1 }.status();
        let capped = ProgressEvent::CycleLimitReached { revisions: 3 }.status();
        assert!(accepted.contains("accepted"));
        assert!(capped.contains("limit reached"));
        assert_ne!(accepted, capped);
    }
}
