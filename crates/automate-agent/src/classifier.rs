//! Incident classification and categorization.
//!
//! Each raw incident is summarized, then analyzed into an
//! [`IncidentAnalysis`]. The fine-grained categories of a batch are handed
//! to the [`LabelGeneralizer`] and every incident is mapped to its parent.

use core::result::Result as CoreResult;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use automate_core::{
    AutomateConfig, ChatRequest, Error, InferenceClient, Result, StructuredResponse,
    require_non_blank,
};

use crate::capabilities::non_empty_reply;
use crate::extractor::Extractor;
use crate::prompts;
use crate::taxonomy::LabelGeneralizer;

/// `YYYY-MM-DD HH:MM:SS` or `YYYY/MM/DD HH:MM:SS`.
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"^\d{4}(?:-\d{2}-\d{2}|/\d{2}/\d{2}) \d{2}:\d{2}:\d{2}$") {
        Ok(regex) => regex,
        Err(err) => panic!("Timestamp regex is invalid: {err}"),
    }
});

/// Structured analysis of one incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentAnalysis {
    /// Affected server, service or device.
    pub asset_name: String,
    /// Fine-grained classification, later generalized to a parent.
    pub category: String,
    /// A person had to intervene.
    pub is_manual: bool,
    /// Service was unavailable.
    pub is_outage: bool,
    /// Current ticket status.
    pub status: String,
    /// When the incident was reported, `YYYY-MM-DD HH:MM:SS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_reported: Option<String>,
    /// When the incident was resolved, `YYYY-MM-DD HH:MM:SS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_resolved: Option<String>,
}

impl StructuredResponse for IncidentAnalysis {
    fn check(&self) -> CoreResult<(), String> {
        if self.category.trim().is_empty() {
            return Err("analysis has a blank category".to_owned());
        }
        for (field, value) in [
            ("date_reported", &self.date_reported),
            ("date_resolved", &self.date_resolved),
        ] {
            let text = value.as_deref().map_or("", str::trim);
            if !text.is_empty() && !TIMESTAMP.is_match(text) {
                return Err(format!("{field} {text:?} is not a YYYY-MM-DD HH:MM:SS timestamp"));
            }
        }
        Ok(())
    }
}

impl IncidentAnalysis {
    /// Trims fields, drops blank dates and writes dates with `-` separators.
    fn normalized(mut self) -> Self {
        self.category = self.category.trim().to_owned();
        self.asset_name = self.asset_name.trim().to_owned();
        self.status = self.status.trim().to_owned();
        for date in [&mut self.date_reported, &mut self.date_resolved] {
            *date = date
                .take()
                .map(|text| text.trim().replace('/', "-"))
                .filter(|text| !text.is_empty());
        }
        self
    }
}

/// An incident with its summary and analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedIncident {
    /// Raw incident record.
    pub incident: String,
    /// Model-written summary.
    pub summary: String,
    /// Structured analysis of the summary.
    pub analysis: IncidentAnalysis,
}

/// A classified incident and the parent of its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorizedIncident {
    /// The classified incident.
    pub classified: ClassifiedIncident,
    /// Parent category, or [`crate::UNSPECIFIED`].
    pub parent: String,
}

/// Summarizes and analyzes single incidents.
pub struct IncidentClassifier {
    /// Inference client for the summary.
    client: Arc<dyn InferenceClient>,
    /// Extractor for the analysis.
    extractor: Extractor,
    /// Classification model.
    model: String,
}

impl IncidentClassifier {
    /// Creates a classifier using the taxonomy model.
    pub fn new(client: Arc<dyn InferenceClient>, config: &AutomateConfig) -> Self {
        Self {
            extractor: Extractor::new(Arc::clone(&client))
                .with_max_attempts(config.retries.extraction_attempts),
            client,
            model: config.models.taxonomy.clone(),
        }
    }

    /// Summarizes `incident` and extracts its analysis.
    ///
    /// # Errors
    /// Returns `EmptyInput` for a blank incident, a provider error, or
    /// `MalformedResponse` when the summary is empty or the analysis cannot
    /// be parsed within the retry budget.
    pub async fn classify(&self, incident: &str) -> Result<ClassifiedIncident> {
        require_non_blank("incident", incident)?;

        let chat = ChatRequest::new(self.model.clone(), incident)
            .with_instructions(prompts::INCIDENT_SUMMARY);
        let summary = non_empty_reply("summary", self.client.chat(&chat).await?)?;
        debug!("Incident summary: {summary}");

        let request = ChatRequest::new(self.model.clone(), summary.clone())
            .with_instructions(prompts::INCIDENT_ANALYSIS);
        let analysis = self
            .extractor
            .extract::<IncidentAnalysis>(&request)
            .await?
            .normalized();
        info!(
            asset = %analysis.asset_name,
            category = %analysis.category,
            outage = analysis.is_outage,
            "Classified incident"
        );

        Ok(ClassifiedIncident {
            incident: incident.to_owned(),
            summary,
            analysis,
        })
    }
}

/// Classifies a batch of incidents and maps each to a parent category.
pub struct IncidentCategorizer {
    /// Per-incident classifier.
    classifier: IncidentClassifier,
    /// Category generalizer.
    generalizer: LabelGeneralizer,
}

impl IncidentCategorizer {
    /// Creates a categorizer from configuration.
    pub fn new(client: Arc<dyn InferenceClient>, config: &AutomateConfig) -> Self {
        Self {
            classifier: IncidentClassifier::new(Arc::clone(&client), config),
            generalizer: LabelGeneralizer::new(client, config),
        }
    }

    /// Classifies every non-blank incident in order, generalizes their
    /// categories and resolves each one to its parent.
    ///
    /// # Errors
    /// Returns `EmptyInput` when no non-blank incident is given, and
    /// propagates classification and taxonomy failures.
    pub async fn categorize<S: AsRef<str>>(
        &self,
        incidents: &[S],
    ) -> Result<Vec<CategorizedIncident>> {
        let records: Vec<&str> = incidents
            .iter()
            .map(|record| record.as_ref())
            .filter(|record| !record.trim().is_empty())
            .collect();
        if records.is_empty() {
            return Err(Error::EmptyInput { field: "incidents" });
        }

        let mut classified = Vec::with_capacity(records.len());
        for record in records {
            classified.push(self.classifier.classify(record).await?);
        }

        let categories: Vec<&str> = classified
            .iter()
            .map(|incident| incident.analysis.category.as_str())
            .collect();
        let mapping = self.generalizer.generalize(&categories).await?;
        info!(
            incidents = classified.len(),
            parents = mapping.groups().len(),
            "Categorized incidents"
        );

        Ok(classified
            .into_iter()
            .map(|incident| {
                let parent = mapping.resolve(&incident.analysis.category);
                CategorizedIncident {
                    classified: incident,
                    parent,
                }
            })
            .collect())
    }
}
