///
/// This module implements the CLI interface for repo-scribe: command parsing, wiring the
/// configured adapters into the pipeline, and printing the run result.
///
/// All pipeline logic (state machine, stage functions, result aggregation) lives in the
/// [`repo-scribe-core`] crate. This module is CLI glue only.
///
/// ## How To Use
/// - Command-line users: `repo-scribe document --config docs.yaml` (add `--mock` to run
///   against the built-in sample repository without any credentials).
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`repo-scribe-core`]: ../../repo-scribe-core/
use crate::generate::ChatGenerator;
use crate::load_config::{load_config, CliConfig, Secrets, Settings};
use crate::publish::ConfluencePublisher;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repo_scribe_core::contract::PublishTarget;
use repo_scribe_core::github::GitHubSource;
use repo_scribe_core::harness::{demo_repository, InMemoryPublisher, ScriptedGenerator};
use repo_scribe_core::{document_repository, RunResult};
use std::path::PathBuf;

/// Parent page used by `--mock` runs when none is configured.
pub const MOCK_PARENT_PAGE_ID: &str = "12345";

/// CLI for repo-scribe: document a GitHub repository into Confluence.
#[derive(Parser)]
#[clap(
    name = "repo-scribe",
    version,
    about = "Generate technical documentation for a GitHub repository and publish it to Confluence"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Document the configured repository and publish the pages
    Document {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Use in-memory adapters and the built-in sample repository; no network, no secrets
        #[clap(long)]
        mock: bool,
        /// Print the run result as JSON
        #[clap(long)]
        json: bool,
    },
    /// Validate the config file and required environment variables without running
    CheckConfig {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Human-readable summary of a run result.
pub fn render_summary(result: &RunResult) -> String {
    let mut out = format!("Status: {:?}\n", result.status);
    if let Some(error) = &result.error {
        out.push_str(&format!("Error: {error}\n"));
    }
    out.push_str(&format!("Files documented: {}\n", result.files.len()));
    for file in &result.files {
        out.push_str(&format!("  - {}\n", file.path));
    }
    out.push_str(&format!("Pages published: {}\n", result.pages_published));
    if !result.publish_failures.is_empty() {
        out.push_str(&format!("Pages failed: {}\n", result.publish_failures.len()));
        for failure in &result.publish_failures {
            out.push_str(&format!("  - {}: {}\n", failure.title, failure.error));
        }
    }
    out
}

fn mock_publish_target(config: &CliConfig) -> Result<PublishTarget> {
    let mut run = config.run_config();
    run.publish
        .parent_page_id
        .get_or_insert_with(|| MOCK_PARENT_PAGE_ID.to_string());
    run.validate().context("Invalid configuration")
}

async fn document(config: CliConfig, mock: bool) -> Result<RunResult> {
    let state = if mock {
        tracing::info!(command = "document", "Running against in-memory adapters");
        let publish_target = mock_publish_target(&config)?;
        let source = demo_repository();
        let generator = ScriptedGenerator::new();
        let publisher = InMemoryPublisher::new();
        document_repository(&source, &generator, &publisher, config.target, publish_target).await
    } else {
        let settings = Settings::resolve(config, Secrets::from_env()?)?;
        let source = GitHubSource::new(settings.github)
            .context("Failed to construct GitHub client")?;
        let generator = ChatGenerator::new(settings.generator);
        let publisher = ConfluencePublisher::new(settings.confluence);
        document_repository(
            &source,
            &generator,
            &publisher,
            settings.target,
            settings.publish_target,
        )
        .await
    };
    Ok(RunResult::from(&state))
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Document { config, mock, json } => {
            let config = load_config(config)?;
            tracing::info!(command = "document", mock, "Starting documentation run");
            let result = document(config, mock).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_summary(&result));
            }

            if result.is_success() {
                tracing::info!(command = "document", "Documentation run complete");
                return Ok(());
            }
            let error = result.error.unwrap_or_default();
            tracing::error!(command = "document", error = %error, "Documentation run failed");
            Err(anyhow::anyhow!("Documentation run failed: {error}"))
        }
        Commands::CheckConfig { config } => {
            let config = load_config(config)?;
            let settings = Settings::resolve(config, Secrets::from_env()?)?;
            println!(
                "Configuration OK: {}/{} -> space {} (parent {})",
                settings.target.owner,
                settings.target.name,
                settings.publish_target.space_key,
                settings.publish_target.parent_page_id
            );
            Ok(())
        }
    }
}
