//! Configuration record passed explicitly into every component.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Complete automation configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomateConfig {
    /// Inference service connection settings
    pub inference: InferenceConfig,
    /// Model names per pipeline role
    pub models: ModelConfig,
    /// Retry budgets
    pub retries: RetryConfig,
    /// Refinement loop settings
    pub orchestration: OrchestrationConfig,
    /// Static analysis settings
    pub validation: ValidationConfig,
    /// Environmental knowledge source
    pub knowledge: KnowledgeConfig,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

/// Inference service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// API key; `OPENAI_API_KEY` is used when absent
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens per response
    pub max_output_tokens: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_owned(),
            api_key: None,
            timeout_seconds: 60,
            temperature: 0.3,
            max_output_tokens: 2048,
        }
    }
}

/// Model names per pipeline role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model used to create and revise plans
    pub planning: String,
    /// Model used to judge plans
    pub judge: String,
    /// Model used to detect languages and write code
    pub coding: String,
    /// Model used to generalize labels
    pub taxonomy: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            planning: "granite4".to_owned(),
            judge: "granite4".to_owned(),
            coding: "granite4".to_owned(),
            taxonomy: "granite4".to_owned(),
        }
    }
}

/// Retry budgets for model calls that must return structured data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts for the structured extractor
    pub extraction_attempts: usize,
    /// Attempts for taxonomy generation
    pub taxonomy_attempts: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            extraction_attempts: 3,
            taxonomy_attempts: 5,
        }
    }
}

/// Refinement loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Maximum number of revise calls before generation is forced
    pub max_cycles: usize,
    /// Maximum number of parent labels a taxonomy may contain
    pub max_parent_labels: usize,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_cycles: 3,
            max_parent_labels: 12,
        }
    }
}

/// Static analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Directory for scoped temporary files; the system temp dir when absent
    pub work_dir: Option<PathBuf>,
    /// Timeout in seconds for one tool invocation
    pub timeout_seconds: u64,
    /// Program used to lint Ansible playbooks
    pub ansible_lint: String,
    /// Program used to check shell scripts
    pub shellcheck: String,
    /// Program used to run `PSScriptAnalyzer`
    pub pwsh: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            timeout_seconds: 120,
            ansible_lint: "ansible-lint".to_owned(),
            shellcheck: "shellcheck".to_owned(),
            pwsh: "pwsh".to_owned(),
        }
    }
}

/// Environmental knowledge source used for research.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Base URL the artifact name is appended to
    pub base_url: Option<String>,
    /// Artifact holding the environment description
    pub artifact: String,
    /// Fail the run instead of continuing without context
    pub fail_on_error: bool,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            artifact: "environment.md".to_owned(),
            fail_on_error: false,
        }
    }
}

impl AutomateConfig {
    /// Get the default config directory path (`~/.automate`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        use dirs::home_dir;
        let home = home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".automate"))
    }

    /// Get the default config file path (`~/.automate/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location, creating it with defaults if missing
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|error| Error::Config(format!("Failed to read config: {error}")))?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                Error::Config(format!("Failed to create config directory: {error}"))
            })?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|error| Error::Config(format!("Failed to serialize config: {error}")))?;

        let header = "# Automate Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{contents}"))
            .map_err(|error| Error::Config(format!("Failed to write config: {error}")))?;

        Ok(())
    }

    /// Overlay settings from process environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Overlay settings from a variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = non_blank("OPENAI_BASE_URL") {
            self.inference.base_url = value;
        }
        if let Some(value) = non_blank("OPENAI_API_KEY") {
            self.inference.api_key = Some(value);
        }
        if let Some(value) = non_blank("PLANNING_MODEL") {
            self.models.planning = value;
        }
        if let Some(value) = non_blank("JUDGE_PLAN_MODEL") {
            self.models.judge = value;
        }
        if let Some(value) = non_blank("CODING_MODEL") {
            self.models.coding = value;
        }
        if let Some(value) = non_blank("OPENAI_MODEL") {
            self.models.taxonomy = value;
        }
        if let Some(value) = non_blank("WORK_DIR") {
            self.validation.work_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = non_blank("KNOWLEDGE_ENVIRONMENT_URL") {
            self.knowledge.base_url = Some(value);
        }
        if let Some(value) = non_blank("LOG_LEVEL") {
            self.log_level = value;
        }
    }

    /// Rejects budgets that would make a component unable to run.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.inference.timeout_seconds == 0 {
            return Err(Error::Config(
                "inference.timeout_seconds must be at least 1".to_owned(),
            ));
        }
        if self.retries.extraction_attempts == 0 {
            return Err(Error::Config(
                "retries.extraction_attempts must be at least 1".to_owned(),
            ));
        }
        if self.retries.taxonomy_attempts == 0 {
            return Err(Error::Config(
                "retries.taxonomy_attempts must be at least 1".to_owned(),
            ));
        }
        if self.orchestration.max_cycles == 0 {
            return Err(Error::Config(
                "orchestration.max_cycles must be at least 1".to_owned(),
            ));
        }
        if self.orchestration.max_parent_labels == 0 {
            return Err(Error::Config(
                "orchestration.max_parent_labels must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Log filter to use when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &str {
        if self.log_level.trim().is_empty() {
            "info"
        } else {
            &self.log_level
        }
    }
}
