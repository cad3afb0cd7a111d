//! Model-backed plan, judge and revise capabilities.

use std::sync::Arc;

use tracing::{debug, info};

use automate_core::{
    AutomateConfig, ChatRequest, Error, InferenceClient, Judgment, Plan, Result,
    require_non_blank,
};

use crate::extractor::Extractor;
use crate::prompts;

/// Fails when the model answered with nothing.
pub(crate) fn non_empty_reply(stage: &str, reply: String) -> Result<String> {
    if reply.trim().is_empty() {
        return Err(Error::MalformedResponse {
            attempts: 1,
            reason: format!("model returned an empty {stage}"),
        });
    }
    Ok(reply.trim().to_owned())
}

/// Writes the first implementation plan.
pub struct Planner {
    /// Inference client.
    client: Arc<dyn InferenceClient>,
    /// Planning model.
    model: String,
}

impl Planner {
    /// Creates a planner from configuration.
    pub fn new(client: Arc<dyn InferenceClient>, config: &AutomateConfig) -> Self {
        Self {
            client,
            model: config.models.planning.clone(),
        }
    }

    /// Creates a plan for `request` informed by `research`.
    ///
    /// # Errors
    /// Returns `EmptyInput` for a blank argument, a provider error, or
    /// `MalformedResponse` when the model returns no text.
    pub async fn create_plan(&self, request: &str, research: &str) -> Result<String> {
        require_non_blank("user_request", request)?;
        require_non_blank("research", research)?;

        let input = format!("{request}\n\nContext:\n{research}");
        let chat = ChatRequest::new(self.model.clone(), input).with_instructions(prompts::PLANNER);
        let plan = non_empty_reply("plan", self.client.chat(&chat).await?)?;
        info!(chars = plan.len(), "Created implementation plan");
        debug!("Suggested plan: {plan}");
        Ok(plan)
    }
}

/// Reviews a plan and returns a structured verdict.
pub struct PlanJudge {
    /// Extractor wrapping the inference client.
    extractor: Extractor,
    /// Judge model.
    model: String,
}

impl PlanJudge {
    /// Creates a judge from configuration.
    pub fn new(client: Arc<dyn InferenceClient>, config: &AutomateConfig) -> Self {
        Self {
            extractor: Extractor::new(client)
                .with_max_attempts(config.retries.extraction_attempts),
            model: config.models.judge.clone(),
        }
    }

    /// Judges `plan` against the request and research.
    ///
    /// # Errors
    /// Returns `EmptyInput` for a blank argument and `MalformedResponse` when
    /// the verdict cannot be parsed within the retry budget.
    pub async fn judge(&self, request: &str, research: &str, plan: &str) -> Result<Judgment> {
        require_non_blank("user_request", request)?;
        require_non_blank("research", research)?;
        require_non_blank("nominated_plan", plan)?;

        let input = format!(
            "User Request:\n{request}\n\nResearch:\n{research}\n\nNominated Plan:\n{plan}"
        );
        let chat = ChatRequest::new(self.model.clone(), input).with_instructions(prompts::JUDGE);
        let judgment: Judgment = self.extractor.extract(&chat).await?;
        info!(
            needs_revision = judgment.needs_revision,
            feedback = judgment.feedback.len(),
            "Plan judged"
        );
        Ok(judgment)
    }
}

/// Applies judge feedback to a plan.
pub struct PlanReviser {
    /// Inference client.
    client: Arc<dyn InferenceClient>,
    /// Planning model.
    model: String,
}

impl PlanReviser {
    /// Creates a reviser from configuration.
    pub fn new(client: Arc<dyn InferenceClient>, config: &AutomateConfig) -> Self {
        Self {
            client,
            model: config.models.planning.clone(),
        }
    }

    /// Returns the full revised plan text.
    ///
    /// # Errors
    /// Returns `EmptyInput` for a blank argument, a provider error, or
    /// `MalformedResponse` when the model returns no text.
    pub async fn revise(&self, feedback: &str, plan: &str) -> Result<String> {
        require_non_blank("feedback", feedback)?;
        require_non_blank("plan", plan)?;

        let input = format!("Feedback:\n{feedback}\n\nImplementation Plan:\n{plan}");
        let chat = ChatRequest::new(self.model.clone(), input).with_instructions(prompts::REVISER);
        let revised = non_empty_reply("revised plan", self.client.chat(&chat).await?)?;
        debug!("Updated plan: {revised}");
        Ok(revised)
    }

    /// Revises the current plan version.
    ///
    /// # Errors
    /// Same as [`PlanReviser::revise`].
    pub async fn revise_plan(&self, feedback: &str, plan: &Plan) -> Result<String> {
        self.revise(feedback, &plan.text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automate_providers::MockInferenceClient;

    fn config() -> AutomateConfig {
        let mut config = AutomateConfig::default();
        config.models.planning = "planner".to_owned();
        config.models.judge = "judge".to_owned();
        config
    }

    #[tokio::test]
    async fn test_plan_prompt_carries_request_and_research() {
        let mock = MockInferenceClient::new().with_model_reply("planner", "Language: bash\n1. do it");
        let planner = Planner::new(Arc::new(mock.clone()), &config());

        let plan = planner
            .create_plan("restart web service", "All servers are RHEL")
            .await
            .unwrap();
        assert!(plan.starts_with("Language: bash"));

        let calls = mock.calls_for("planner");
        assert_eq!(calls.len(), 1);
        assert!(calls[0].request.input.contains("restart web service"));
        assert!(calls[0].request.input.contains("Context:\nAll servers are RHEL"));
        assert_eq!(calls[0].request.instructions.as_deref(), Some(prompts::PLANNER));
    }

    #[tokio::test]
    async fn test_blank_research_is_never_sent() {
        let mock = MockInferenceClient::new().with_reply("unused");
        let planner = Planner::new(Arc::new(mock.clone()), &config());

        let error = planner.create_plan("restart", "  ").await.unwrap_err();
        assert!(matches!(error, Error::EmptyInput { field: "research" }));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_judge_retries_flag_without_feedback() {
        let mock = MockInferenceClient::new().with_replies([
            r#"{"revise_plan_flag": true, "feedback": []}"#,
            "```json\n{\"revise_plan_flag\": true, \"feedback\": [\"missing error handling\"]}\n```",
        ]);
        let judge = PlanJudge::new(Arc::new(mock.clone()), &config());

        let judgment = judge.judge("request", "research", "plan").await.unwrap();
        assert!(judgment.needs_revision);
        assert_eq!(judgment.feedback, vec!["missing error handling".to_owned()]);
        assert_eq!(mock.call_count(), 2);
        assert!(mock.get_call_history().iter().all(|call| call.json_mode));
    }

    #[tokio::test]
    async fn test_judge_gives_up_after_budget() {
        let mock = MockInferenceClient::new().with_default_response("not json at all");
        let judge = PlanJudge::new(Arc::new(mock.clone()), &config());

        match judge.judge("request", "research", "plan").await {
            Err(Error::MalformedResponse { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_revise_prompt_and_empty_reply() {
        let mock = MockInferenceClient::new()
            .with_reply("revised plan")
            .with_reply("   ");
        let reviser = PlanReviser::new(Arc::new(mock.clone()), &config());

        let plan = Plan::new(1, "old plan");
        let revised = reviser
            .revise_plan("Specific Feedback:\n1.) add logging\n", &plan)
            .await
            .unwrap();
        assert_eq!(revised, "revised plan");
        let input = &mock.get_call_history()[0].request.input;
        assert!(input.starts_with("Feedback:\nSpecific Feedback:\n1.) add logging"));
        assert!(input.ends_with("Implementation Plan:\nold plan"));

        let error = reviser.revise("feedback", "old plan").await.unwrap_err();
        assert!(matches!(error, Error::MalformedResponse { .. }));
    }
}
