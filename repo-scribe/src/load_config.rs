/// `load_config` module: loads a static YAML config and merges environment secrets into the
/// explicit [`Settings`] value the CLI hands to adapter constructors.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file (target, publish location, endpoint overrides)
/// - Read every secret from the environment once, at process start
/// - Report all missing environment variables in a single error
///
/// The orchestrator never reads the environment: everything it needs arrives through
/// [`Settings`].
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use repo_scribe_core::config::{PublishSettings, RunConfig};
use repo_scribe_core::contract::{PublishTarget, RepoTarget};
use repo_scribe_core::github::GitHubConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::generate::{GeneratorConfig, DEFAULT_API_BASE_URL, DEFAULT_MODEL};
use crate::publish::ConfluenceConfig;

/// Optional overrides for the text-generation endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct GeneratorSection {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    pub target: RepoTarget,
    #[serde(default)]
    pub publish: PublishSettings,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub generator: GeneratorSection,
}

impl CliConfig {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            target: self.target.clone(),
            publish: self.publish.clone(),
        }
    }
}

/// Loads a static YAML config file (no secrets). A missing `publish.parent_page_id` or
/// `publish.space_key` is filled from `PARENT_PAGE_ID` or `CONFLUENCE_SPACE_KEY` when set.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if config.publish.parent_page_id.is_none() {
        if let Ok(parent) = std::env::var("PARENT_PAGE_ID") {
            info!("publish.parent_page_id taken from PARENT_PAGE_ID");
            config.publish.parent_page_id = Some(parent);
        }
    }
    if config.publish.space_key.is_none() {
        if let Ok(space_key) = std::env::var("CONFLUENCE_SPACE_KEY") {
            info!(space_key = %space_key, "publish.space_key taken from CONFLUENCE_SPACE_KEY");
            config.publish.space_key = Some(space_key);
        }
    }

    config.run_config().trace_loaded();
    Ok(config)
}

/// Credentials read from the environment.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub github_token: Option<String>,
    pub confluence_url: String,
    pub confluence_user: String,
    pub confluence_api_token: String,
    pub openai_api_key: String,
    pub openai_model: Option<String>,
}

impl Secrets {
    pub const REQUIRED: [&'static str; 4] = [
        "CONFLUENCE_URL",
        "CONFLUENCE_USER",
        "CONFLUENCE_API_TOKEN",
        "OPENAI_API_KEY",
    ];

    /// Read secrets through `lookup`; every missing or empty required variable is listed in
    /// the error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let missing: Vec<&str> = Self::REQUIRED
            .into_iter()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            error!(?missing, "Required environment variables not set");
            anyhow::bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }
        let required = |key: &str| get(key).unwrap_or_default();
        let github_token = get("GITHUB_TOKEN");
        if github_token.is_none() {
            info!("GITHUB_TOKEN not set, GitHub requests will be anonymous");
        }
        Ok(Self {
            github_token,
            confluence_url: required("CONFLUENCE_URL"),
            confluence_user: required("CONFLUENCE_USER"),
            confluence_api_token: required("CONFLUENCE_API_TOKEN"),
            openai_api_key: required("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL"),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Fully resolved configuration for a networked run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub target: RepoTarget,
    pub publish_target: PublishTarget,
    pub github: GitHubConfig,
    pub generator: GeneratorConfig,
    pub confluence: ConfluenceConfig,
}

impl Settings {
    pub fn resolve(config: CliConfig, secrets: Secrets) -> Result<Self> {
        let publish_target = config
            .run_config()
            .validate()
            .context("Invalid configuration")?;

        let github = GitHubConfig {
            token: secrets.github_token,
            ..config.github
        };
        let generator = GeneratorConfig {
            api_base_url: config
                .generator
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            model: secrets
                .openai_model
                .or(config.generator.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ..GeneratorConfig::new(secrets.openai_api_key)
        };
        let confluence = ConfluenceConfig {
            base_url: secrets.confluence_url,
            user: secrets.confluence_user,
            api_token: secrets.confluence_api_token,
        };

        info!(
            model = %generator.model,
            confluence = %confluence.base_url,
            "Settings resolved"
        );
        Ok(Self {
            target: config.target,
            publish_target,
            github,
            generator,
            confluence,
        })
    }
}
