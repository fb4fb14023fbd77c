//! Error taxonomy for the pipeline.
//!
//! [`FetchError`] and [`AnalysisError`] are run-fatal: the orchestrator records the first one
//! in [`RunState`](crate::state::RunState) and stops. [`PublishError`] is page-local: it is
//! recorded against the page title and the remaining upserts still run.

use thiserror::Error;

use crate::state::Stage;

/// Enumeration or content retrieval failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("entry {0} has no fetch locator")]
    MissingLocator(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// The generator call failed or returned unusable output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("generator service error: {0}")]
    Service(String),
    #[error("generator returned empty output for {label}")]
    EmptyOutput { label: String },
}

/// A single page upsert failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("HTTP {status} while publishing {title:?}")]
    Http { status: u16, title: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("page {title:?} rejected: {reason}")]
    Rejected { title: String, reason: String },
}

/// The single run-fatal failure recorded on a run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RunFailure {
    /// Stage that was executing when the run failed.
    pub stage: Stage,
    pub message: String,
}

impl RunFailure {
    /// The listing error itself is logged by the caller; the message is fixed.
    pub fn enumeration() -> Self {
        Self {
            stage: Stage::Enumerating,
            message: "Failed to fetch files from GitHub".to_string(),
        }
    }

    pub fn content_fetch(path: &str, err: &FetchError) -> Self {
        Self {
            stage: Stage::Analyzing,
            message: format!("Error fetching content for {path}: {err}"),
        }
    }

    pub fn analysis(path: &str, err: &AnalysisError) -> Self {
        Self {
            stage: Stage::Analyzing,
            message: format!("Error in code analyzer for {path}: {err}"),
        }
    }

    pub fn synthesis(err: &AnalysisError) -> Self {
        Self {
            stage: Stage::Synthesizing,
            message: format!("Error in repository synthesis: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_messages_name_the_stage() {
        let fetch = FetchError::Http {
            status: 404,
            url: "https://api.example/x".into(),
        };
        assert_eq!(
            RunFailure::enumeration().to_string(),
            "Failed to fetch files from GitHub"
        );
        assert_eq!(
            RunFailure::content_fetch("src/a.py", &fetch).to_string(),
            "Error fetching content for src/a.py: HTTP 404 from https://api.example/x"
        );
        let failure = RunFailure::analysis(
            "a.py",
            &AnalysisError::EmptyOutput {
                label: "a.py".into(),
            },
        );
        assert_eq!(failure.stage, Stage::Analyzing);
        assert!(failure.message.starts_with("Error in code analyzer for a.py"));
        assert_eq!(
            RunFailure::synthesis(&AnalysisError::Service("boom".into())).stage,
            Stage::Synthesizing
        );
    }
}
