//! Plans, their revision history, and the judge's verdict on them.

use core::fmt::Write as _;
use core::result::Result as CoreResult;

use serde::{Deserialize, Serialize};

use crate::{Error, Language, Result, StructuredResponse};

/// Line prefixes recognised as a language declaration inside a plan.
const DECLARATION_KEYS: [&str; 4] = [
    "language:",
    "programming language:",
    "automation language:",
    "target language:",
];

/// One version of an implementation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// 1 for the planning stage output, incremented by every revision.
    pub version: usize,
    /// Full plan text.
    pub text: String,
}

impl Plan {
    /// Creates a plan version.
    pub fn new(version: usize, text: impl Into<String>) -> Self {
        Self {
            version,
            text: text.into(),
        }
    }

    /// Returns the language the plan declares via a `Language: <name>` line.
    ///
    /// `Ok(None)` means the plan carries no declaration at all. Declaration
    /// lines naming something other than a supported language are ignored
    /// once another line names a supported one.
    ///
    /// # Errors
    /// Returns `UnsupportedLanguage` when no declaration names a supported
    /// language, or when the plan declares two different languages.
    pub fn declared_language(&self) -> Result<Option<Language>> {
        let mut found: Option<Language> = None;
        let mut unresolved: Option<String> = None;
        for value in self.text.lines().filter_map(declaration_value) {
            let Some(language) = resolve_declared(&value) else {
                if unresolved.is_none() {
                    unresolved = Some(value);
                }
                continue;
            };
            match found {
                Some(previous) if previous != language => {
                    return Err(Error::UnsupportedLanguage(format!(
                        "ambiguous plan declares both {previous} and {language}"
                    )));
                }
                _ => found = Some(language),
            }
        }
        match (found, unresolved) {
            (None, Some(value)) => Err(Error::UnsupportedLanguage(value)),
            (language, _) => Ok(language),
        }
    }
}

/// Extracts the value of a language declaration line, if `line` is one.
fn declaration_value(line: &str) -> Option<String> {
    let cleaned = line
        .replace("**", "")
        .replace('`', "")
        .trim_start_matches(|ch: char| ch.is_whitespace() || matches!(ch, '-' | '*' | '#' | '>'))
        .to_owned();
    let lowered = cleaned.to_ascii_lowercase();
    DECLARATION_KEYS.iter().find_map(|key| {
        lowered
            .starts_with(key)
            .then(|| cleaned[key.len()..].trim().to_owned())
    })
}

/// Resolves a declared value, trying the whole value then its first word.
fn resolve_declared(value: &str) -> Option<Language> {
    Language::from_name(value).or_else(|| {
        value
            .split(|ch: char| ch.is_whitespace() || matches!(ch, '(' | ',' | ';'))
            .find(|word| !word.is_empty())
            .and_then(Language::from_name)
    })
}

/// Every plan version produced during one run.
///
/// The last entry is the current plan; earlier entries are kept for audit
/// and are never modified.
#[derive(Debug, Clone, Serialize)]
pub struct PlanHistory {
    /// Plan versions in creation order.
    versions: Vec<Plan>,
}

impl PlanHistory {
    /// Starts a history with the planning stage output.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            versions: vec![Plan::new(1, initial)],
        }
    }

    /// Replaces the current plan with a revision and returns it.
    pub fn revise(&mut self, text: impl Into<String>) -> &Plan {
        let version = self.versions.len() + 1;
        self.versions.push(Plan::new(version, text));
        &self.versions[version - 1]
    }

    /// The current plan version.
    pub fn current(&self) -> &Plan {
        let last = self.versions.len() - 1;
        &self.versions[last]
    }

    /// All versions, oldest first.
    pub fn versions(&self) -> &[Plan] {
        &self.versions
    }

    /// Number of revisions applied on top of the initial plan.
    pub fn revision_count(&self) -> usize {
        self.versions.len() - 1
    }

    /// Consumes the history, returning the current plan.
    pub fn into_current(mut self) -> Plan {
        let last = self.versions.len() - 1;
        self.versions.swap_remove(last)
    }
}

/// The judge's structured verdict on a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    /// Whether the plan must be revised before code generation.
    #[serde(alias = "revise_plan_flag")]
    pub needs_revision: bool,
    /// Ordered, itemised feedback.
    pub feedback: Vec<String>,
}

impl Judgment {
    /// A verdict that accepts the plan as-is.
    pub fn accepted() -> Self {
        Self {
            needs_revision: false,
            feedback: Vec::new(),
        }
    }

    /// A verdict asking for the given revisions.
    pub fn revise<I, S>(feedback: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            needs_revision: true,
            feedback: feedback.into_iter().map(Into::into).collect(),
        }
    }

    /// Markdown summary used for progress reporting.
    pub fn summary(&self) -> String {
        let mut summary = if self.needs_revision {
            "# Revisions Required\n".to_owned()
        } else {
            "# Quality Plan\n".to_owned()
        };
        for item in &self.feedback {
            let _ignored = writeln!(summary, "* {item}");
        }
        summary
    }
}

impl StructuredResponse for Judgment {
    fn check(&self) -> CoreResult<(), String> {
        if self.needs_revision && self.feedback.iter().all(|item| item.trim().is_empty()) {
            return Err("judgment requests revision but gives no feedback".to_owned());
        }
        Ok(())
    }
}

/// Numbered textual form of one judgment's feedback, fed to the reviser.
///
/// Built fresh from the latest judgment every cycle; bundles are never
/// merged across cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackBundle {
    /// Rendered bundle text.
    text: String,
}

impl FeedbackBundle {
    /// Renders a judgment's feedback as a 1-based `N.) item` list.
    pub fn from_judgment(judgment: &Judgment) -> Self {
        let mut text = "Specific Feedback:\n".to_owned();
        for (index, item) in judgment
            .feedback
            .iter()
            .filter(|item| !item.trim().is_empty())
            .enumerate()
        {
            let _ignored = writeln!(text, "{}.) {}", index + 1, item.trim());
        }
        Self { text }
    }

    /// Bundle text.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}
