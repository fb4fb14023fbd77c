//! # contract: capability interfaces for the documentation pipeline
//!
//! This module defines the three traits the orchestrator consumes and the plain
//! data types that cross those boundaries:
//!
//! - [`RepositorySource`]: enumerate files under a repository path and read raw file text.
//! - [`ContentGenerator`]: turn source text into documentation, and synthesize the two
//!   repository-level documents.
//! - [`PublishingTarget`]: create-or-update a page, keyed by its title.
//!
//! ## Interface & Extensibility
//! - Each trait has a network-backed implementor (GitHub, chat completions, Confluence)
//!   and a deterministic in-memory implementor in [`crate::harness`].
//! - All methods are async and return the typed errors from [`crate::error`].
//! - Adapters must not keep per-run state. One adapter instance may serve many runs.
//!
//! ## Mocking & Testing
//! - The traits are annotated for `mockall`, so tests can assert exact call counts
//!   (e.g. "no upsert happens after an analysis failure").

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{AnalysisError, FetchError, PublishError};
use crate::state::FileTask;

/// Identifies what to document: a repository and an optional path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTarget {
    pub owner: String,
    pub name: String,
    /// Path inside the repository. Empty means the repository root.
    #[serde(default)]
    pub path: String,
}

impl RepoTarget {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Kind of a listed repository entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks, submodules and anything else the host reports.
    #[serde(other)]
    Other,
}

/// One entry returned by [`RepositorySource::list_files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Opaque handle passed back to [`RepositorySource::read_file`]. Directories have none.
    #[serde(rename = "download_url", default)]
    pub fetch_locator: Option<String>,
}

impl RawEntry {
    pub fn file(name: &str, path: &str, locator: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind: EntryKind::File,
            fetch_locator: Some(locator.to_string()),
        }
    }

    pub fn dir(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind: EntryKind::Dir,
            fetch_locator: None,
        }
    }
}

/// Where published pages land. Constant for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishTarget {
    pub space_key: String,
    pub parent_page_id: String,
}

/// A single create-or-update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUpsert {
    pub space_key: String,
    /// Idempotency key: an existing page with this exact title is updated in place.
    pub title: String,
    pub body: String,
    pub parent_id: String,
}

/// Whether an upsert created a page or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Created,
    Updated,
}

/// What the publishing target reports back after a successful upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReceipt {
    pub page_id: String,
    pub title: String,
    pub version: u64,
    pub action: UpsertAction,
}

/// Lists and reads files from a hosted repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// List the entries directly under `target.path`, in the order the host returns them.
    async fn list_files(&self, target: &RepoTarget) -> Result<Vec<RawEntry>, FetchError>;

    /// Fetch the raw text behind a locator obtained from [`RepositorySource::list_files`].
    async fn read_file(&self, locator: &str) -> Result<String, FetchError>;
}

/// Produces documentation text. The orchestrator stores the text and never interprets it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Document one source file.
    async fn analyze_file(&self, content: &str, filename: &str) -> Result<String, AnalysisError>;

    /// Describe the repository structure from task names and paths.
    async fn synthesize_repository_overview(
        &self,
        tasks: &[FileTask],
    ) -> Result<String, AnalysisError>;

    /// Draft a README for the repository from task names and paths.
    async fn synthesize_readme(
        &self,
        repo_name: &str,
        tasks: &[FileTask],
    ) -> Result<String, AnalysisError>;
}

/// Create-or-update pages keyed by title.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PublishingTarget: Send + Sync {
    /// Look up `req.title` in `req.space_key`; replace its body and bump its version if
    /// found, otherwise create it under `req.parent_id`.
    async fn upsert(&self, req: &PageUpsert) -> Result<PageReceipt, PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_entry_deserializes_github_shape() {
        let json = r#"[
            {"name": "main.py", "path": "src/main.py", "type": "file",
             "download_url": "https://raw.example/src/main.py", "sha": "abc"},
            {"name": "lib", "path": "src/lib", "type": "dir", "download_url": null},
            {"name": "vendor", "path": "src/vendor", "type": "submodule"}
        ]"#;
        let entries: Vec<RawEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(
            entries[0],
            RawEntry::file("main.py", "src/main.py", "https://raw.example/src/main.py")
        );
        assert_eq!(entries[1], RawEntry::dir("lib", "src/lib"));
        assert_eq!(entries[2].kind, EntryKind::Other);
        assert_eq!(entries[2].fetch_locator, None);
    }
}
