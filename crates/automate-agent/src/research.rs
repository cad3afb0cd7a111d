//! Environmental context gathered once per request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, warn};

use automate_core::{Error, KnowledgeConfig, Result, require_non_blank};

/// Text returned when no environmental context could be downloaded.
pub const NO_CONTEXT_WARNING: &str = "WARNING: No environmental context is available!  \
This will negatively impact the quality of any responses provided.";

/// Timeout for one knowledge download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces research for a request.
#[async_trait]
pub trait Researcher: Send + Sync {
    /// Gathers context relevant to `request`.
    ///
    /// # Errors
    /// Returns `EmptyInput` for a blank request or a source-specific error.
    async fn research(&self, request: &str) -> Result<String>;
}

/// Returns fixed, caller-supplied research.
#[derive(Debug, Clone)]
pub struct StaticResearch {
    /// Research text.
    text: String,
}

impl StaticResearch {
    /// Creates a researcher that always answers with `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Researcher for StaticResearch {
    async fn research(&self, request: &str) -> Result<String> {
        require_non_blank("user_request", request)?;
        Ok(self.text.clone())
    }
}

/// Downloads an environment description from a knowledge repository.
pub struct KnowledgeResearcher {
    /// HTTP client.
    client: Client,
    /// URL the artifact name is appended to.
    base_url: Option<String>,
    /// Artifact to download.
    artifact: String,
    /// Raise instead of returning the warning text.
    fail_on_error: bool,
}

impl KnowledgeResearcher {
    /// Creates a researcher from configuration.
    ///
    /// # Errors
    /// Returns `EmptyInput` for a blank artifact name.
    pub fn from_config(config: &KnowledgeConfig) -> Result<Self> {
        require_non_blank("artifact_name", &config.artifact)?;
        let client = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|err| Error::Provider(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            artifact: config.artifact.clone(),
            fail_on_error: config.fail_on_error,
        })
    }

    /// Full artifact URL, when a repository is configured.
    pub fn artifact_url(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .filter(|base| !base.trim().is_empty())
            .map(|base| format!("{base}{}", self.artifact))
    }

    /// Downloads the artifact body.
    async fn download(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "knowledge download returned status {}",
                response.status()
            )));
        }
        Ok(response.text().await?)
    }

    /// Applies the failure policy to a download problem.
    fn degrade(&self, message: String) -> Result<String> {
        if self.fail_on_error {
            error!("{message}");
            Err(Error::Config(message))
        } else {
            warn!("{message}");
            Ok(NO_CONTEXT_WARNING.to_owned())
        }
    }
}

#[async_trait]
impl Researcher for KnowledgeResearcher {
    async fn research(&self, request: &str) -> Result<String> {
        require_non_blank("user_request", request)?;

        let Some(url) = self.artifact_url() else {
            return self.degrade("No knowledge repository is configured".to_owned());
        };

        info!(url, "Downloading environmental knowledge");
        match self.download(&url).await {
            Ok(body) if !body.trim().is_empty() => Ok(body),
            Ok(_) => self.degrade(format!("Knowledge artifact at {url} is empty")),
            Err(err) => self.degrade(format!(
                "Unable to download environmental knowledge.  URL={url}  Error={err}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_research() {
        let researcher = StaticResearch::new("All servers are RHEL");
        assert_eq!(
            researcher.research("restart httpd").await.unwrap(),
            "All servers are RHEL"
        );
        let error = researcher.research(" ").await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "'user_request' is a required argument and cannot be empty"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_repository_degrades_to_warning() {
        let researcher = KnowledgeResearcher::from_config(&KnowledgeConfig::default()).unwrap();
        assert_eq!(researcher.artifact_url(), None);
        assert_eq!(
            researcher.research("restart httpd").await.unwrap(),
            NO_CONTEXT_WARNING
        );
    }

    #[tokio::test]
    async fn test_fail_on_error_raises() {
        let config = KnowledgeConfig {
            fail_on_error: true,
            ..KnowledgeConfig::default()
        };
        let researcher = KnowledgeResearcher::from_config(&config).unwrap();
        assert!(matches!(
            researcher.research("restart httpd").await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_repository_degrades_to_warning() {
        let config = KnowledgeConfig {
            base_url: Some("http://127.0.0.1:9/knowledge/".to_owned()),
            ..KnowledgeConfig::default()
        };
        let researcher = KnowledgeResearcher::from_config(&config).unwrap();
        assert_eq!(
            researcher.artifact_url().as_deref(),
            Some("http://127.0.0.1:9/knowledge/environment.md")
        );
        assert_eq!(
            researcher.research("restart httpd").await.unwrap(),
            NO_CONTEXT_WARNING
        );
    }
}
