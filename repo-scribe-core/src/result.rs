//! The run result handed to callers. This is the only shape a presentation layer should read.

use serde::Serialize;

use crate::state::{PageFailure, RunState, RunStatus};

/// Documentation produced for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDocumentation {
    pub name: String,
    pub path: String,
    pub documentation: String,
}

/// Outcome of a run.
///
/// On a run-fatal failure `files` is empty and `error` carries the message. On success
/// `files` carries every task in listing order, whatever happened while publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub files: Vec<FileDocumentation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pages_published: usize,
    pub publish_failures: Vec<PageFailure>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

impl From<&RunState> for RunResult {
    fn from(state: &RunState) -> Self {
        if let Some(failure) = state.failure() {
            return RunResult {
                status: state.status(),
                files: Vec::new(),
                error: Some(failure.to_string()),
                pages_published: 0,
                publish_failures: Vec::new(),
            };
        }

        let summary = state.publish_summary();
        RunResult {
            status: state.status(),
            files: state
                .tasks()
                .iter()
                .map(|task| FileDocumentation {
                    name: task.name.clone(),
                    path: task.path.clone(),
                    documentation: task.documentation().unwrap_or_default().to_string(),
                })
                .collect(),
            error: None,
            pages_published: summary.pages.len(),
            publish_failures: summary.failures.clone(),
        }
    }
}
