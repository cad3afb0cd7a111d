//! Language-specific code generators.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use automate_core::{
    AutomateConfig, ChatRequest, Error, InferenceClient, Language, Result, require_non_blank,
};

use crate::prompts;

/// Stem used when the model does not produce a usable filename.
pub const FALLBACK_STEM: &str = "automation";

/// Longest filename stem kept from the model's suggestion.
const MAX_STEM_LEN: usize = 48;

/// Source text and filename produced by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    /// Purpose-derived filename including extension.
    pub filename: String,
    /// Source text, never blank.
    pub source: String,
}

/// Turns a finalized plan into source code for one language.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Language this generator writes.
    fn language(&self) -> Language;

    /// Writes source code implementing `plan`.
    ///
    /// # Errors
    /// Returns `EmptyInput` for a blank plan and `GenerationFailed` when no
    /// source text is produced.
    async fn generate(&self, plan: &str) -> Result<GeneratedCode>;
}

/// Removes a surrounding Markdown code fence, if present.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```bash) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim_matches('\n')
}

/// Normalizes a suggested name into a lowercase `snake_case` stem.
pub fn slugify(suggestion: &str) -> String {
    let first_line = suggestion.lines().next().unwrap_or_default();
    let stem = first_line
        .trim()
        .trim_matches(|ch: char| ch == '`' || ch == '"' || ch == '\'')
        .split('.')
        .next()
        .unwrap_or_default();

    let mut slug = String::with_capacity(stem.len());
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }

    let slug = slug.trim_matches('_');
    let mut slug = slug.chars().take(MAX_STEM_LEN).collect::<String>();
    while slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        FALLBACK_STEM.to_owned()
    } else {
        slug
    }
}

/// Generator that asks the coding model for source text.
pub struct ModelCodeGenerator {
    /// Language written by this generator.
    language: Language,
    /// Inference client.
    client: Arc<dyn InferenceClient>,
    /// Coding model.
    model: String,
}

impl ModelCodeGenerator {
    /// Creates a generator for `language`.
    pub fn new(language: Language, client: Arc<dyn InferenceClient>, model: impl Into<String>) -> Self {
        Self {
            language,
            client,
            model: model.into(),
        }
    }

    /// One generator per supported language, using the configured coding model.
    pub fn for_all_languages(
        client: &Arc<dyn InferenceClient>,
        config: &AutomateConfig,
    ) -> Vec<Arc<dyn CodeGenerator>> {
        Language::ALL
            .iter()
            .map(|language| {
                Arc::new(Self::new(
                    *language,
                    Arc::clone(client),
                    config.models.coding.clone(),
                )) as Arc<dyn CodeGenerator>
            })
            .collect()
    }

    /// System instructions for this language.
    fn instructions(&self) -> &'static str {
        match self.language {
            Language::Ansible => prompts::ANSIBLE,
            Language::Bash => prompts::BASH,
            Language::PowerShell => prompts::POWERSHELL,
        }
    }

    /// Asks for a purpose-derived filename, falling back on any failure.
    async fn filename_for(&self, plan: &str) -> String {
        let chat = ChatRequest::new(self.model.clone(), plan).with_instructions(prompts::FILENAME);
        let stem = match self.client.chat(&chat).await {
            Ok(suggestion) => slugify(&suggestion),
            Err(err) => {
                warn!("Unable to name the generated {} artifact: {err}", self.language);
                FALLBACK_STEM.to_owned()
            }
        };
        format!("{stem}.{}", self.language.extension())
    }
}

#[async_trait]
impl CodeGenerator for ModelCodeGenerator {
    fn language(&self) -> Language {
        self.language
    }

    async fn generate(&self, plan: &str) -> Result<GeneratedCode> {
        require_non_blank("plan", plan)?;

        let chat = ChatRequest::new(self.model.clone(), plan).with_instructions(self.instructions());
        let reply = self.client.chat(&chat).await?;
        let source = strip_code_fence(&reply);
        if source.trim().is_empty() {
            return Err(Error::GenerationFailed {
                language: self.language.tag().to_owned(),
                reason: "model responded with empty source text".to_owned(),
            });
        }
        debug!("Generated {} source:\n{source}", self.language);

        let filename = self.filename_for(plan).await;
        info!(language = %self.language, filename, "Generated code artifact");
        Ok(GeneratedCode {
            filename,
            source: format!("{source}\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automate_providers::MockInferenceClient;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```bash\necho hi\n```"), "echo hi");
        assert_eq!(strip_code_fence("  echo hi  "), "echo hi");
        assert_eq!(strip_code_fence("```\n---\n- hosts: all\n```\n"), "---\n- hosts: all");
        assert_eq!(strip_code_fence("```yaml\n- hosts: all"), "- hosts: all");
        assert_eq!(strip_code_fence("```"), "");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Restart Web Service"), "restart_web_service");
        assert_eq!(slugify("`restart_httpd.sh`"), "restart_httpd");
        assert_eq!(slugify("reboot-vm\nbecause it is stuck"), "reboot_vm");
        assert_eq!(slugify("  ...  "), FALLBACK_STEM);
        assert_eq!(slugify(""), FALLBACK_STEM);
        assert!(slugify(&"word ".repeat(40)).len() <= MAX_STEM_LEN);
    }

    #[tokio::test]
    async fn test_generate_strips_fence_and_names_file() {
        let mock = MockInferenceClient::new().with_replies([
            "```bash\n#!/bin/bash\nsystemctl restart httpd\n```",
            "restart_httpd",
        ]);
        let generator = ModelCodeGenerator::new(Language::Bash, Arc::new(mock.clone()), "coder");

        let code = generator.generate("Language: bash\nrestart httpd").await.unwrap();
        assert_eq!(code.filename, "restart_httpd.sh");
        assert_eq!(code.source, "#!/bin/bash\nsystemctl restart httpd\n");

        let history = mock.get_call_history();
        assert_eq!(history[0].request.instructions.as_deref(), Some(prompts::BASH));
        assert_eq!(history[1].request.instructions.as_deref(), Some(prompts::FILENAME));
    }

    #[tokio::test]
    async fn test_filename_falls_back_when_naming_fails() {
        let mock = MockInferenceClient::new()
            .with_reply("- hosts: all")
            .with_failure("naming model offline");
        let generator = ModelCodeGenerator::new(Language::Ansible, Arc::new(mock), "coder");

        let code = generator.generate("Language: ansible").await.unwrap();
        assert_eq!(code.filename, "automation.yaml");
    }

    #[tokio::test]
    async fn test_empty_source_is_generation_failure() {
        let mock = MockInferenceClient::new().with_reply("```powershell\n```");
        let generator = ModelCodeGenerator::new(Language::PowerShell, Arc::new(mock.clone()), "coder");

        match generator.generate("Language: powershell").await {
            Err(Error::GenerationFailed { language, .. }) => assert_eq!(language, "powershell"),
            other => panic!("expected GenerationFailed, got {other:?}"),
        }
        assert_eq!(mock.call_count(), 1, "no filename request after a failure");
    }
}
