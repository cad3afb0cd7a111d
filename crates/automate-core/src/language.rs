//! The closed set of automation languages a plan may target.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Target language of a plan and of the code artifact generated from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Ansible playbook (YAML).
    Ansible,
    /// Bash shell script.
    Bash,
    /// `PowerShell` script.
    PowerShell,
}

impl Language {
    /// Every supported language, in registration order.
    pub const ALL: [Self; 3] = [Self::Ansible, Self::Bash, Self::PowerShell];

    /// Lowercase tag used in plans, artifacts and reports.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Ansible => "ansible",
            Self::Bash => "bash",
            Self::PowerShell => "powershell",
        }
    }

    /// File extension (without the dot) for generated artifacts.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Ansible => "yaml",
            Self::Bash => "sh",
            Self::PowerShell => "ps1",
        }
    }

    /// Resolves a free-form language name, accepting common aliases.
    ///
    /// Returns `None` for anything outside the closed set, including blanks.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name
            .trim()
            .trim_matches(|ch: char| ch == '*' || ch == '`' || ch == '.' || ch == '"')
            .trim()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "ansible" | "ansible playbook" | "playbook" => Some(Self::Ansible),
            "bash" | "sh" | "shell script" | "bash script" => Some(Self::Bash),
            "powershell" | "pwsh" | "powershell script" => Some(Self::PowerShell),
            _ => None,
        }
    }

    /// Comma separated list of supported tags, for error messages and prompts.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|language| language.tag())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Language {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::from_name(name).ok_or_else(|| Error::UnsupportedLanguage(name.trim().to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve() {
        assert_eq!(Language::from_name("Ansible Playbook"), Some(Language::Ansible));
        assert_eq!(Language::from_name(" **bash** "), Some(Language::Bash));
        assert_eq!(Language::from_name("pwsh"), Some(Language::PowerShell));
        assert_eq!(Language::from_name("PowerShell."), Some(Language::PowerShell));
    }

    #[test]
    fn test_unknown_languages_rejected() {
        assert_eq!(Language::from_name("java"), None);
        assert_eq!(Language::from_name(""), None);
        assert_eq!(Language::from_name("n/a"), None);

        let error = "python".parse::<Language>().unwrap_err();
        assert!(matches!(error, Error::UnsupportedLanguage(name) if name == "python"));
    }

    #[test]
    fn test_tags_round_trip_through_parse() {
        for language in Language::ALL {
            assert_eq!(language.tag().parse::<Language>().unwrap(), language);
        }
        assert_eq!(Language::supported_list(), "ansible, bash, powershell");
    }
}
