//! Collapses fine-grained labels into a bounded parent taxonomy.

use core::result::Result as CoreResult;
use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use automate_core::{
    AutomateConfig, ChatRequest, Error, InferenceClient, Result, StructuredResponse,
};

use crate::extractor::{parse_structured, strip_wrappers};
use crate::prompts;

/// Parent label for blank or unmapped labels.
pub const UNSPECIFIED: &str = "Unspecified";

/// One parent label and the fine-grained labels it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    /// Parent label.
    #[serde(alias = "parent")]
    pub category: String,
    /// Member labels.
    #[serde(alias = "members")]
    pub subcategories: Vec<String>,
}

/// Parent groups in the order the model returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMapping {
    /// Groups, first match wins.
    groups: Vec<CategoryGroup>,
}

impl StructuredResponse for LabelMapping {
    fn check(&self) -> CoreResult<(), String> {
        if self.groups.is_empty() {
            return Err("mapping contains no parent groups".to_owned());
        }
        if let Some(group) = self
            .groups
            .iter()
            .find(|group| group.category.trim().is_empty())
        {
            return Err(format!(
                "group with members {:?} has a blank parent label",
                group.subcategories
            ));
        }
        Ok(())
    }
}

impl LabelMapping {
    /// Builds a mapping from groups.
    pub fn new(groups: Vec<CategoryGroup>) -> Self {
        Self { groups }
    }

    /// Groups in encounter order.
    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    /// Parent labels in encounter order.
    pub fn parents(&self) -> Vec<&str> {
        self.groups
            .iter()
            .map(|group| group.category.as_str())
            .collect()
    }

    /// Resolves one label to its parent, falling back to [`UNSPECIFIED`].
    pub fn resolve(&self, label: &str) -> String {
        resolve(self, label)
    }

    /// Resolves labels in order.
    pub fn resolve_all<S: AsRef<str>>(&self, labels: &[S]) -> Vec<String> {
        labels
            .iter()
            .map(|label| resolve(self, label.as_ref()))
            .collect()
    }
}

/// Pure lookup: the first group listing `label` wins.
pub fn resolve(mapping: &LabelMapping, label: &str) -> String {
    if label.trim().is_empty() {
        warn!("Empty label, using {UNSPECIFIED}");
        return UNSPECIFIED.to_owned();
    }
    mapping
        .groups
        .iter()
        .find(|group| group.subcategories.iter().any(|member| member == label))
        .map_or_else(
            || {
                warn!(label, "No parent found for label, using {UNSPECIFIED}");
                UNSPECIFIED.to_owned()
            },
            |group| group.category.clone(),
        )
}

/// Deduplicates labels in first-seen order, dropping blanks.
pub fn distinct_labels<S: AsRef<str>>(labels: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    labels
        .iter()
        .map(|label: &S| label.as_ref())
        .filter(|label| !label.trim().is_empty())
        .filter(|label| seen.insert(*label))
        .collect()
}

/// Model-assisted label generalizer.
pub struct LabelGeneralizer {
    /// Inference client.
    client: Arc<dyn InferenceClient>,
    /// Model used for the mapping.
    model: String,
    /// Model calls allowed per generalization.
    max_attempts: usize,
    /// Maximum parent groups in an accepted mapping.
    max_parents: usize,
}

impl LabelGeneralizer {
    /// Creates a generalizer from configuration.
    pub fn new(client: Arc<dyn InferenceClient>, config: &AutomateConfig) -> Self {
        Self {
            client,
            model: config.models.taxonomy.clone(),
            max_attempts: config.retries.taxonomy_attempts.max(1),
            max_parents: config.orchestration.max_parent_labels.max(1),
        }
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Asks the model to group `labels` under at most `max_parents` parents.
    ///
    /// # Errors
    /// Returns `EmptyInput` when no non-blank label remains, and
    /// `TaxonomyGenerationFailed` once the retry budget is exhausted.
    pub async fn generalize<S: AsRef<str>>(&self, labels: &[S]) -> Result<LabelMapping> {
        let distinct = distinct_labels(labels);
        if distinct.is_empty() {
            return Err(Error::EmptyInput { field: "labels" });
        }
        let payload = distinct.join("\n");
        debug!(count = distinct.len(), "Generalizing labels:\n{payload}");

        let instructions = prompts::TAXONOMY.replace("{max}", &self.max_parents.to_string());
        let request = ChatRequest::new(self.model.clone(), payload).with_instructions(instructions);

        let mut last_reason = String::new();
        for attempt in 1..=self.max_attempts {
            let raw = match self.client.chat_json(&request).await {
                Ok(raw) => raw,
                Err(err) if err.is_retryable() => {
                    warn!(attempt, "Taxonomy request failed, retrying: {err}");
                    last_reason = err.to_string();
                    continue;
                }
                Err(err) => return Err(err),
            };

            match self.accept(&raw) {
                Ok(mapping) => {
                    info!(
                        attempt,
                        parents = mapping.groups.len(),
                        "Generated parent taxonomy"
                    );
                    return Ok(mapping);
                }
                Err(reason) => {
                    warn!(attempt, "Unusable taxonomy, retrying: {reason}");
                    last_reason = reason;
                }
            }
        }

        error!(
            attempts = self.max_attempts,
            "Unable to produce a parsable parent taxonomy"
        );
        Err(Error::TaxonomyGenerationFailed {
            attempts: self.max_attempts,
            reason: last_reason,
        })
    }

    /// Parses a reply and enforces the parent cap.
    fn accept(&self, raw: &str) -> CoreResult<LabelMapping, String> {
        let mapping: LabelMapping = parse_structured(&strip_wrappers(raw))?;
        if mapping.groups.len() > self.max_parents {
            return Err(format!(
                "mapping has {} parent groups, more than the cap of {}",
                mapping.groups.len(),
                self.max_parents
            ));
        }
        Ok(mapping)
    }
}
