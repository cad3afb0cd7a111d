//! Subcommand handlers.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use tracing::info;

use automate_agent::{
    CategorizedIncident, IncidentCategorizer, LabelGeneralizer, PlanRefinementOrchestrator,
    StaticResearch,
};
use automate_core::{AutomateConfig, InferenceClient};
use automate_providers::OpenAiClient;

/// Loads configuration from `path`, or from the default location.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_config(path: Option<&Path>) -> Result<AutomateConfig> {
    let mut config = match path {
        Some(path) => AutomateConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AutomateConfig::load_or_create()?,
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Builds the inference client named by the configuration.
fn client(config: &AutomateConfig) -> Result<Arc<dyn InferenceClient>> {
    Ok(Arc::new(OpenAiClient::from_config(&config.inference)?))
}

/// Runs the full pipeline and writes the artifact into `output`.
///
/// # Errors
/// Returns an error if the run fails or the artifact cannot be written.
pub async fn handle_run(
    config: &AutomateConfig,
    request: &str,
    research: Option<String>,
    output: &Path,
) -> Result<()> {
    let mut orchestrator = PlanRefinementOrchestrator::new(client(config)?, config)?;
    if let Some(text) = research {
        orchestrator = orchestrator.with_researcher(Arc::new(StaticResearch::new(text)));
    }

    let outcome = orchestrator.run(request).await?;

    fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;
    let path = output.join(&outcome.artifact.filename);
    fs::write(&path, &outcome.artifact.source)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Artifact written");

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "Generated {} ({})", path.display(), outcome.artifact.language)?;
    writeln!(stdout, "Plan revisions: {}", outcome.history.revision_count())?;
    writeln!(stdout, "\n{}", outcome.report)?;
    Ok(())
}

/// Non-blank, trimmed lines of `file`.
fn read_lines(file: &Path) -> Result<Vec<String>> {
    let contents =
        fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Classifies each incident in `file` and prints one CSV row per incident
/// with its category and parent category.
///
/// # Errors
/// Returns an error if the file cannot be read, an incident cannot be
/// classified, or no taxonomy is produced.
pub async fn handle_categorize(config: &AutomateConfig, file: &Path) -> Result<()> {
    let incidents = read_lines(file)?;
    let categorized = IncidentCategorizer::new(client(config)?, config)
        .categorize(&incidents)
        .await?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{INCIDENT_HEADER}")?;
    for incident in &categorized {
        writeln!(stdout, "{}", incident_row(incident))?;
    }
    Ok(())
}

/// Generalizes the labels in `file` and prints `label,parent` rows.
///
/// # Errors
/// Returns an error if the file cannot be read or no taxonomy is produced.
pub async fn handle_categorize_labels(config: &AutomateConfig, file: &Path) -> Result<()> {
    let labels = read_lines(file)?;
    let mapping = LabelGeneralizer::new(client(config)?, config)
        .generalize(&labels)
        .await?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "label,parent")?;
    for (label, parent) in labels.iter().zip(mapping.resolve_all(&labels)) {
        writeln!(stdout, "{},{}", csv_field(label), csv_field(&parent))?;
    }
    Ok(())
}

/// Column names of [`incident_row`].
const INCIDENT_HEADER: &str =
    "incident,asset_name,category,parent,is_manual,is_outage,status,date_reported,date_resolved";

/// One CSV row for a categorized incident.
fn incident_row(item: &CategorizedIncident) -> String {
    let analysis = &item.classified.analysis;
    let fields: [&str; 9] = [
        &item.classified.incident,
        &analysis.asset_name,
        &analysis.category,
        &item.parent,
        if analysis.is_manual { "true" } else { "false" },
        if analysis.is_outage { "true" } else { "false" },
        &analysis.status,
        analysis.date_reported.as_deref().unwrap_or_default(),
        analysis.date_resolved.as_deref().unwrap_or_default(),
    ];
    fields.map(csv_field).join(",")
}

/// Writes the default configuration to `path` or the default location.
///
/// # Errors
/// Returns an error if the file exists (without `force`) or cannot be written.
pub fn handle_init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => AutomateConfig::config_path()?,
    };
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    AutomateConfig::default().save_to_file(&path)?;
    writeln!(io::stdout().lock(), "Wrote {}", path.display())?;
    Ok(())
}

/// Quotes a CSV field when it contains a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automate_agent::{ClassifiedIncident, IncidentAnalysis};

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("Disk Full"), "Disk Full");
        assert_eq!(csv_field("CPU, high"), "\"CPU, high\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_incident_row_quotes_fields_and_blanks_missing_dates() {
        let item = CategorizedIncident {
            classified: ClassifiedIncident {
                incident: "web01, OOM".to_owned(),
                summary: "web01 ran out of memory".to_owned(),
                analysis: IncidentAnalysis {
                    asset_name: "web01".to_owned(),
                    category: "Memory Pressure".to_owned(),
                    is_manual: true,
                    is_outage: false,
                    status: "Resolved".to_owned(),
                    date_reported: Some("2024-03-01 08:15:00".to_owned()),
                    date_resolved: None,
                },
            },
            parent: "System Resources".to_owned(),
        };
        assert_eq!(
            incident_row(&item),
            "\"web01, OOM\",web01,Memory Pressure,System Resources,true,false,Resolved,2024-03-01 08:15:00,"
        );
        assert_eq!(INCIDENT_HEADER.split(',').count(), 9);
    }
}
