//! Static analysis of generated code with external lint tools.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::{Builder as TempFileBuilder, NamedTempFile};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use automate_core::{
    CodeArtifact, Language, Result, ValidationConfig, ValidationReport, require_non_blank,
};

/// Runs static analysis on source text.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Validates `source` written in `language`.
    ///
    /// # Errors
    /// Only internal failures such as an unwritable work directory are
    /// errors; tool problems are reported in the returned report.
    async fn validate(&self, language: Language, source: &str) -> Result<ValidationReport>;

    /// Validates a generated artifact.
    ///
    /// # Errors
    /// Same as [`Validator::validate`].
    async fn validate_artifact(&self, artifact: &CodeArtifact) -> Result<ValidationReport> {
        self.validate(artifact.language, &artifact.source).await
    }
}

/// External command checking one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintTool {
    /// Language checked.
    language: Language,
    /// Program to execute.
    program: String,
}

impl LintTool {
    /// Creates a tool invoking `program` for `language`.
    pub fn new(language: Language, program: impl Into<String>) -> Self {
        Self {
            language,
            program: program.into(),
        }
    }

    /// Default tool for `language`.
    pub fn default_for(language: Language) -> Self {
        Self::from_config(language, &ValidationConfig::default())
    }

    /// Tool for `language` honoring configured program overrides.
    pub fn from_config(language: Language, config: &ValidationConfig) -> Self {
        let program = match language {
            Language::Ansible => &config.ansible_lint,
            Language::Bash => &config.shellcheck,
            Language::PowerShell => &config.pwsh,
        };
        Self::new(language, program.clone())
    }

    /// Name shown in reports.
    pub fn display_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.program)
    }

    /// Arguments checking the file at `path`.
    pub fn arguments(&self, path: &Path) -> Vec<String> {
        let path = path.display().to_string();
        match self.language {
            Language::Ansible => vec!["--nocolor".to_owned(), path],
            Language::Bash => vec!["--format=gcc".to_owned(), path],
            Language::PowerShell => vec![
                "-NoProfile".to_owned(),
                "-NonInteractive".to_owned(),
                "-Command".to_owned(),
                format!("Invoke-ScriptAnalyzer -Path '{}'", path.replace('\'', "''")),
            ],
        }
    }

    /// Command ready to spawn.
    fn command(&self, path: &Path, work_dir: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.arguments(path))
            .current_dir(work_dir)
            .kill_on_drop(true);
        command
    }
}

/// Replaces environment-specific paths in tool output with `display`.
pub fn sanitize_output(output: &str, temp_path: &Path, display: &str) -> String {
    let full = temp_path.display().to_string();
    let mut sanitized = output.replace(&full, display);
    if let Some(name) = temp_path.file_name().and_then(|name| name.to_str()) {
        sanitized = sanitized.replace(name, display);
    }
    if let Some(parent) = temp_path.parent() {
        let prefix = format!("{}/", parent.display());
        sanitized = sanitized.replace(&prefix, "");
    }
    sanitized.trim().to_owned()
}

/// Validator writing each source to a scoped temporary file.
pub struct StaticAnalysisValidator {
    /// Lint tool per language.
    tools: HashMap<Language, LintTool>,
    /// Directory for temporary files.
    work_dir: Option<PathBuf>,
    /// Per-invocation timeout.
    timeout: Duration,
}

impl StaticAnalysisValidator {
    /// Creates a validator from configuration.
    pub fn from_config(config: &ValidationConfig) -> Self {
        let tools = Language::ALL
            .into_iter()
            .map(|language| (language, LintTool::from_config(language, config)))
            .collect();
        Self {
            tools,
            work_dir: config.work_dir.clone(),
            timeout: Duration::from_secs(config.timeout_seconds.max(1)),
        }
    }

    /// Replaces the tool for one language.
    #[must_use]
    pub fn with_tool(mut self, tool: LintTool) -> Self {
        self.tools.insert(tool.language, tool);
        self
    }

    /// Sets the per-invocation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tool registered for `language`.
    pub fn tool(&self, language: Language) -> Option<&LintTool> {
        self.tools.get(&language)
    }

    /// Writes `source` to a uniquely named file removed when dropped.
    fn write_scoped(&self, language: Language, source: &str) -> Result<NamedTempFile> {
        let suffix = format!(".{}", language.extension());
        let mut builder = TempFileBuilder::new();
        builder.prefix("automate-").suffix(&suffix);
        let mut file = match &self.work_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                builder.tempfile_in(dir)?
            }
            None => builder.tempfile()?,
        };
        file.write_all(source.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    /// Validates `source`, naming it `display` in the report.
    ///
    /// # Errors
    /// Returns an I/O error if the temporary file cannot be written.
    pub async fn validate_as(
        &self,
        language: Language,
        source: &str,
        display: &str,
    ) -> Result<ValidationReport> {
        require_non_blank("source_code", source)?;
        let tool = self
            .tools
            .get(&language)
            .cloned()
            .unwrap_or_else(|| LintTool::default_for(language));

        let file = self.write_scoped(language, source)?;
        let path = file.path().to_path_buf();
        let work_dir = path
            .parent()
            .map_or_else(env::temp_dir, Path::to_path_buf);

        let start = Instant::now();
        let result = timeout(self.timeout, tool.command(&path, &work_dir).output()).await;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let report = match result {
            Err(_elapsed) => {
                warn!(tool = tool.display_name(), "Static analysis timed out");
                ValidationReport::could_not_validate(
                    tool.display_name(),
                    format!("{} timed out after {}s", tool.display_name(), self.timeout.as_secs()),
                )
            }
            Ok(Err(err)) if err.kind() == ErrorKind::NotFound => {
                warn!(program = %tool.program, "Static analysis tool is not installed");
                ValidationReport::tool_unavailable(tool.display_name())
            }
            Ok(Err(err)) => {
                warn!(program = %tool.program, "Unable to run static analysis: {err}");
                ValidationReport::could_not_validate(tool.display_name(), err)
            }
            Ok(Ok(output)) => interpret(&tool, &output, &path, display),
        };

        info!(
            tool = tool.display_name(),
            outcome = ?report.outcome,
            elapsed_ms,
            "Static analysis finished"
        );
        drop(file);
        Ok(report)
    }
}

/// Classifies a finished tool run. Any output is a finding, whatever the
/// exit status; silence is clean only on success.
fn interpret(tool: &LintTool, output: &Output, path: &Path, display: &str) -> ValidationReport {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}\n{}", stdout.trim(), stderr.trim());
    let text = sanitize_output(&combined, path, display);
    debug!(status = %output.status, "Static analysis output:\n{text}");

    match (output.status.success(), text.is_empty()) {
        (true, true) => ValidationReport::clean(tool.display_name()),
        (_, false) => ValidationReport::findings(tool.display_name(), text),
        (false, true) => ValidationReport::could_not_validate(
            tool.display_name(),
            format!("{} exited with {} and no output", tool.display_name(), output.status),
        ),
    }
}

#[async_trait]
impl Validator for StaticAnalysisValidator {
    async fn validate(&self, language: Language, source: &str) -> Result<ValidationReport> {
        let display = format!("generated.{}", language.extension());
        self.validate_as(language, source, &display).await
    }

    async fn validate_artifact(&self, artifact: &CodeArtifact) -> Result<ValidationReport> {
        self.validate_as(artifact.language, &artifact.source, &artifact.filename)
            .await
    }
}
