//! Routes a finalized plan to the generator for its declared language.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use automate_core::{
    AutomateConfig, ChatRequest, CodeArtifact, Error, InferenceClient, Language, Plan, Result,
};

use crate::generator::{CodeGenerator, ModelCodeGenerator};
use crate::prompts;

/// Model used to read the language of plans without a declaration.
struct LanguageDetector {
    /// Inference client.
    client: Arc<dyn InferenceClient>,
    /// Coding model.
    model: String,
}

impl LanguageDetector {
    /// Asks for a single-word language name.
    async fn detect(&self, plan: &Plan) -> Result<Language> {
        let chat = ChatRequest::new(self.model.clone(), plan.text.clone())
            .with_instructions(prompts::LANGUAGE_DETECTION);
        let answer = self.client.chat(&chat).await?;
        let word = answer
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_owned();
        Language::from_name(&word).ok_or_else(|| {
            Error::UnsupportedLanguage(format!(
                "plan does not name a supported language (model answered '{}'); supported: {}",
                answer.trim(),
                Language::supported_list()
            ))
        })
    }
}

/// Dispatches plans to registered code generators.
pub struct CodeRouter {
    /// Generators keyed by the language they write.
    generators: HashMap<Language, Arc<dyn CodeGenerator>>,
    /// Fallback for plans with no language declaration.
    detector: Option<LanguageDetector>,
}

impl CodeRouter {
    /// Creates a router with no generators and no detection fallback.
    pub fn new() -> Self {
        Self {
            generators: HashMap::new(),
            detector: None,
        }
    }

    /// Creates a router with a model generator for every supported language.
    pub fn from_config(client: &Arc<dyn InferenceClient>, config: &AutomateConfig) -> Self {
        ModelCodeGenerator::for_all_languages(client, config)
            .into_iter()
            .fold(Self::new(), Self::with_generator)
            .with_language_detection(Arc::clone(client), config.models.coding.clone())
    }

    /// Registers a generator, replacing any for the same language.
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generators.insert(generator.language(), generator);
        self
    }

    /// Enables model-based detection for plans without a declaration.
    #[must_use]
    pub fn with_language_detection(
        mut self,
        client: Arc<dyn InferenceClient>,
        model: impl Into<String>,
    ) -> Self {
        self.detector = Some(LanguageDetector {
            client,
            model: model.into(),
        });
        self
    }

    /// Languages with a registered generator.
    pub fn languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|language| self.generators.contains_key(language))
            .collect()
    }

    /// Determines the plan's target language.
    ///
    /// # Errors
    /// Returns `UnsupportedLanguage` for an unknown, ambiguous or missing
    /// declaration that detection cannot settle.
    pub async fn resolve_language(&self, plan: &Plan) -> Result<Language> {
        if let Some(language) = plan.declared_language()? {
            return Ok(language);
        }
        match &self.detector {
            Some(detector) => {
                warn!(version = plan.version, "Plan has no language declaration, asking the model");
                detector.detect(plan).await
            }
            None => Err(Error::UnsupportedLanguage(
                "plan does not declare a target language".to_owned(),
            )),
        }
    }

    /// Generates the code artifact for `plan`.
    ///
    /// # Errors
    /// Returns `UnsupportedLanguage` before any generator runs when the
    /// language cannot be resolved or has no generator, and propagates
    /// generator failures.
    pub async fn route(&self, plan: &Plan) -> Result<CodeArtifact> {
        let language = self.resolve_language(plan).await.inspect_err(|err| {
            error!("Unable to route plan v{}: {err}", plan.version);
        })?;

        let generator = self.generators.get(&language).ok_or_else(|| {
            Error::UnsupportedLanguage(format!("no generator is registered for {language}"))
        })?;

        info!(%language, version = plan.version, "Routing plan to code generator");
        let generated = generator.generate(&plan.text).await?;
        Ok(CodeArtifact {
            language,
            filename: generated.filename,
            source: generated.source,
        })
    }
}

impl Default for CodeRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratedCode;
    use async_trait::async_trait;
    use automate_core::IgnoreLock as _;
    use automate_providers::MockInferenceClient;
    use std::sync::Mutex;

    /// Generator recording the plans it receives.
    struct RecordingGenerator {
        language: Language,
        plans: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CodeGenerator for RecordingGenerator {
        fn language(&self) -> Language {
            self.language
        }

        async fn generate(&self, plan: &str) -> Result<GeneratedCode> {
            self.plans.lock_ignore_poison().push(plan.to_owned());
            Ok(GeneratedCode {
                filename: format!("task.{}", self.language.extension()),
                source: "echo ok\n".to_owned(),
            })
        }
    }

    fn router_with_recorders() -> (CodeRouter, Arc<Mutex<Vec<String>>>) {
        let plans = Arc::new(Mutex::new(Vec::new()));
        let router = Language::ALL.into_iter().fold(CodeRouter::new(), |router, language| {
            router.with_generator(Arc::new(RecordingGenerator {
                language,
                plans: Arc::clone(&plans),
            }))
        });
        (router, plans)
    }

    #[tokio::test]
    async fn test_routes_declared_language() {
        let (router, plans) = router_with_recorders();
        let plan = Plan::new(2, "**Language:** PowerShell\n1. Stop the spooler");

        let artifact = router.route(&plan).await.unwrap();
        assert_eq!(artifact.language, Language::PowerShell);
        assert_eq!(artifact.filename, "task.ps1");
        assert_eq!(plans.lock_ignore_poison().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_language_never_reaches_generator_or_model() {
        let (router, plans) = router_with_recorders();
        let mock = MockInferenceClient::new().with_default_response("bash");
        let router = router.with_language_detection(Arc::new(mock.clone()), "coder");

        for text in [
            "Language: python\nprint('hi')",
            "Language: cobol",
            "Language: bash\nLanguage: ansible",
        ] {
            let result = router.route(&Plan::new(1, text)).await;
            assert!(
                matches!(result, Err(Error::UnsupportedLanguage(_))),
                "plan {text:?} gave {result:?}"
            );
        }
        assert!(plans.lock_ignore_poison().is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_undeclared_language_is_detected() {
        let (router, _plans) = router_with_recorders();
        let mock = MockInferenceClient::new().with_reply("Bash\n");
        let router = router.with_language_detection(Arc::new(mock), "coder");

        let artifact = router
            .route(&Plan::new(1, "1. restart httpd with systemctl"))
            .await
            .unwrap();
        assert_eq!(artifact.language, Language::Bash);
    }

    #[tokio::test]
    async fn test_detection_answering_na_fails() {
        let (router, plans) = router_with_recorders();
        let mock = MockInferenceClient::new().with_reply("n/a");
        let router = router.with_language_detection(Arc::new(mock), "coder");

        let result = router.route(&Plan::new(1, "1. do something")).await;
        assert!(matches!(result, Err(Error::UnsupportedLanguage(_))));
        assert!(plans.lock_ignore_poison().is_empty());
    }

    #[tokio::test]
    async fn test_missing_generator_and_missing_detector() {
        let router = CodeRouter::new();
        assert!(router.languages().is_empty());

        let declared = router.route(&Plan::new(1, "Language: bash")).await;
        assert!(matches!(declared, Err(Error::UnsupportedLanguage(_))));

        let undeclared = router.route(&Plan::new(1, "no declaration")).await;
        assert!(matches!(undeclared, Err(Error::UnsupportedLanguage(_))));
    }
}
