use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::contract::{PublishTarget, RepoTarget};

pub const DEFAULT_SPACE_KEY: &str = "DEV";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("target.{0} must not be empty")]
    EmptyTargetField(&'static str),
    #[error("publish.parent_page_id is required (set it in the config file or PARENT_PAGE_ID)")]
    MissingParentPageId,
    #[error("publish.space_key must not be empty")]
    EmptySpaceKey,
}

/// Where pages are published. Both fields may be filled from the environment later; an
/// unset `space_key` means [`DEFAULT_SPACE_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishSettings {
    #[serde(default)]
    pub space_key: Option<String>,
    #[serde(default)]
    pub parent_page_id: Option<String>,
}

impl PublishSettings {
    pub fn effective_space_key(&self) -> &str {
        self.space_key.as_deref().unwrap_or(DEFAULT_SPACE_KEY)
    }
}

/// Everything needed to describe one run, minus credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub target: RepoTarget,
    #[serde(default)]
    pub publish: PublishSettings,
}

impl RunConfig {
    pub fn trace_loaded(&self) {
        info!(
            owner = %self.target.owner,
            repo = %self.target.name,
            path = %self.target.path,
            space_key = %self.publish.effective_space_key(),
            parent_page_set = self.publish.parent_page_id.is_some(),
            "Loaded RunConfig"
        );
        debug!(?self, "RunConfig loaded (full debug)");
    }

    /// Check required fields and produce the constant publish target for a run.
    pub fn validate(&self) -> Result<PublishTarget, ConfigError> {
        if self.target.owner.trim().is_empty() {
            return Err(ConfigError::EmptyTargetField("owner"));
        }
        if self.target.name.trim().is_empty() {
            return Err(ConfigError::EmptyTargetField("name"));
        }
        let space_key = self.publish.effective_space_key().trim();
        if space_key.is_empty() {
            return Err(ConfigError::EmptySpaceKey);
        }
        let parent_page_id = self
            .publish
            .parent_page_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::MissingParentPageId)?;
        Ok(PublishTarget {
            space_key: space_key.to_string(),
            parent_page_id: parent_page_id.to_string(),
        })
    }
}
