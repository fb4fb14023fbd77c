//! GitHub-backed [`RepositorySource`] using the repository contents API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::contract::{RawEntry, RepoTarget, RepositorySource};
use crate::error::FetchError;

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

fn default_api_base_url() -> String {
    DEFAULT_GITHUB_API.to_string()
}

/// Connection settings for [`GitHubSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Personal access token. Anonymous requests work for public repositories but are
    /// heavily rate limited.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token: None,
        }
    }
}

pub struct GitHubSource {
    client: Client,
    config: GitHubConfig,
}

impl GitHubSource {
    pub fn new(config: GitHubConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("repo-scribe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        info!(
            api_base_url = %config.api_base_url,
            token_set = config.token.is_some(),
            "Initialized GitHub source"
        );
        Ok(Self { client, config })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(url);
        match &self.config.token {
            Some(token) => req.header("Authorization", format!("token {token}")),
            None => req,
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.get(url).send().await.map_err(|e| {
            error!(error = ?e, url = %url, "GitHub request failed");
            FetchError::Transport(e.to_string())
        })?;
        let status = resp.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "GitHub returned error status");
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        resp.text()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// `{api}/repos/{owner}/{name}/contents[/{path}]`
pub fn contents_url(api_base_url: &str, target: &RepoTarget) -> String {
    let base = api_base_url.trim_end_matches('/');
    let path = target.path.trim_matches('/');
    if path.is_empty() {
        format!("{base}/repos/{}/{}/contents", target.owner, target.name)
    } else {
        format!("{base}/repos/{}/{}/contents/{path}", target.owner, target.name)
    }
}

/// Parse a contents API response. A path naming a single file yields an object rather
/// than an array; that is returned as a one-entry listing.
pub fn parse_listing(body: &str) -> Result<Vec<RawEntry>, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let entries = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value::<RawEntry>(value).map(|entry| vec![entry])
    };
    entries.map_err(|e| FetchError::Decode(e.to_string()))
}

#[async_trait]
impl RepositorySource for GitHubSource {
    async fn list_files(&self, target: &RepoTarget) -> Result<Vec<RawEntry>, FetchError> {
        let url = contents_url(&self.config.api_base_url, target);
        info!(url = %url, "Listing GitHub repository contents");
        let body = self.get_text(&url).await?;
        let entries = parse_listing(&body)?;
        debug!(count = entries.len(), "Parsed GitHub listing");
        Ok(entries)
    }

    async fn read_file(&self, locator: &str) -> Result<String, FetchError> {
        debug!(url = %locator, "Downloading file content");
        self.get_text(locator).await
    }
}
