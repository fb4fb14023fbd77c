//! Run state and the stage transition table.
//!
//! [`RunState`] is the single record threaded through every stage of one run. It is owned by
//! the orchestrator for the whole run and never shared between runs.
//!
//! The routing decision is a pure function, [`route`], over a `RunState`. Stage changes go
//! through [`Stage::can_enter`], so the whole state machine can be audited (and tested) here
//! without any adapter involved:
//!
//! ```text
//! Enumerating -> Analyzing -> Synthesizing -> Publishing -> Completed
//!      \              \              \
//!       +--------------+--------------+----> Failed
//! ```

use serde::Serialize;

use crate::contract::{EntryKind, PageReceipt, PublishTarget, RawEntry, RepoTarget};
use crate::error::RunFailure;

/// Extensions that make a file eligible for documentation. Exact set.
pub const SOURCE_EXTENSIONS: [&str; 10] = [
    ".py", ".js", ".ts", ".java", ".c", ".cpp", ".cs", ".go", ".rb", ".php",
];

/// True when `filename` ends with one of [`SOURCE_EXTENSIONS`].
pub fn is_source_file(filename: &str) -> bool {
    SOURCE_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
}

/// Page title for a single file's documentation.
pub fn file_page_title(file_name: &str) -> String {
    format!("Documentation: {file_name}")
}

/// Page title for the repository structure overview.
pub fn structure_page_title(repo_name: &str) -> String {
    format!("Repository Structure: {repo_name}")
}

/// Page title for the synthesized README.
pub fn readme_page_title(repo_name: &str) -> String {
    format!("README: {repo_name}")
}

/// One source file carried through fetch and analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub name: String,
    pub path: String,
    pub fetch_locator: Option<String>,
    content: Option<String>,
    documentation: Option<String>,
}

impl FileTask {
    pub fn new(name: impl Into<String>, path: impl Into<String>, locator: Option<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            fetch_locator: locator,
            content: None,
            documentation: None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    /// Non-empty documentation, if analysis produced any.
    pub fn published_documentation(&self) -> Option<&str> {
        self.documentation.as_deref().filter(|doc| !doc.is_empty())
    }

    // Write-once: a second fill is ignored.
    pub(crate) fn fill_content(&mut self, content: String) {
        if self.content.is_none() {
            self.content = Some(content);
        }
    }

    pub(crate) fn fill_documentation(&mut self, documentation: String) {
        if self.documentation.is_none() {
            self.documentation = Some(documentation);
        }
    }
}

impl From<RawEntry> for FileTask {
    fn from(entry: RawEntry) -> Self {
        FileTask::new(entry.name, entry.path, entry.fetch_locator)
    }
}

/// Pipeline stages. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Enumerating,
    Analyzing,
    Synthesizing,
    Publishing,
    Completed,
    Failed,
}

impl Stage {
    /// Legal transitions.
    pub fn can_enter(self, next: Stage) -> bool {
        use Stage::{Analyzing, Completed, Enumerating, Failed, Publishing, Synthesizing};
        matches!(
            (self, next),
            (Enumerating, Analyzing)
                | (Analyzing, Synthesizing)
                | (Synthesizing, Publishing)
                | (Publishing, Completed)
                | (Enumerating | Analyzing | Synthesizing, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Enumerating => "enumerating",
            Stage::Analyzing => "analyzing",
            Stage::Synthesizing => "synthesizing",
            Stage::Publishing => "publishing",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }
}

/// Coarse status exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// What the orchestrator should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Enumerate,
    /// Fetch (if needed) and analyze the task at this index.
    Analyze(usize),
    Advance(Stage),
    Synthesize,
    Publish,
    Halt,
}

/// The routing table. Pure: reads the state, never touches an adapter.
pub fn route(state: &RunState) -> Step {
    if state.failure.is_some() {
        return Step::Halt;
    }
    match state.stage {
        Stage::Enumerating => Step::Enumerate,
        Stage::Analyzing if state.cursor < state.tasks.len() => Step::Analyze(state.cursor),
        Stage::Analyzing => Step::Advance(Stage::Synthesizing),
        Stage::Synthesizing => Step::Synthesize,
        Stage::Publishing => Step::Publish,
        Stage::Completed | Stage::Failed => Step::Halt,
    }
}

/// A page whose upsert failed. Does not fail the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    pub title: String,
    pub error: String,
}

/// Outcome of the publishing stage, page by page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub pages: Vec<PageReceipt>,
    pub failures: Vec<PageFailure>,
}

/// The mutable record of one run.
#[derive(Debug, Clone)]
pub struct RunState {
    target: RepoTarget,
    tasks: Vec<FileTask>,
    cursor: usize,
    publish_target: PublishTarget,
    stage: Stage,
    failure: Option<RunFailure>,
    overview: Option<String>,
    readme: Option<String>,
    publish: PublishSummary,
}

impl RunState {
    pub fn new(target: RepoTarget, publish_target: PublishTarget) -> Self {
        Self {
            target,
            tasks: Vec::new(),
            cursor: 0,
            publish_target,
            stage: Stage::Enumerating,
            failure: None,
            overview: None,
            readme: None,
            publish: PublishSummary::default(),
        }
    }

    pub fn target(&self) -> &RepoTarget {
        &self.target
    }

    pub fn tasks(&self) -> &[FileTask] {
        &self.tasks
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn publish_target(&self) -> &PublishTarget {
        &self.publish_target
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn status(&self) -> RunStatus {
        match self.stage {
            Stage::Completed => RunStatus::Completed,
            Stage::Failed => RunStatus::Failed,
            _ => RunStatus::Running,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }

    pub fn overview(&self) -> Option<&str> {
        self.overview.as_deref()
    }

    pub fn readme(&self) -> Option<&str> {
        self.readme.as_deref()
    }

    pub fn publish_summary(&self) -> &PublishSummary {
        &self.publish
    }

    /// Keep allowlisted files, in listing order, and move to `Analyzing`.
    /// Keep allowlisted files and enter `Analyzing`. Returns `false` if the transition was
    /// rejected.
    pub(crate) fn load_tasks(&mut self, entries: Vec<RawEntry>) -> bool {
        debug_assert!(self.tasks.is_empty(), "tasks are loaded once");
        self.tasks = entries
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::File)
            .filter(|entry| is_source_file(&entry.name))
            .map(FileTask::from)
            .collect();
        self.enter(Stage::Analyzing)
    }

    pub(crate) fn task_mut(&mut self, index: usize) -> &mut FileTask {
        &mut self.tasks[index]
    }

    pub(crate) fn advance_cursor(&mut self) {
        if self.failure.is_none() && self.cursor < self.tasks.len() {
            self.cursor += 1;
        }
    }

    pub(crate) fn store_aggregates(&mut self, overview: String, readme: String) {
        self.overview = Some(overview);
        self.readme = Some(readme);
    }

    pub(crate) fn store_publish_summary(&mut self, summary: PublishSummary) {
        self.publish = summary;
    }

    /// Move to `next`. An illegal transition leaves the stage as it was and returns `false`.
    #[must_use]
    pub(crate) fn enter(&mut self, next: Stage) -> bool {
        if !self.stage.can_enter(next) {
            tracing::error!(
                from = self.stage.as_str(),
                to = next.as_str(),
                "Rejected illegal stage transition"
            );
            return false;
        }
        tracing::debug!(from = self.stage.as_str(), to = next.as_str(), "Stage transition");
        self.stage = next;
        true
    }

    /// Record the run-fatal failure. Only the first failure is kept.
    pub(crate) fn fail(&mut self, failure: RunFailure) {
        if self.failure.is_some() || !self.stage.can_enter(Stage::Failed) {
            tracing::warn!(
                stage = self.stage.as_str(),
                failure = %failure,
                "Dropping failure recorded after the run could no longer fail"
            );
            return;
        }
        self.stage = Stage::Failed;
        self.failure = Some(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::RawEntry;

    fn state() -> RunState {
        RunState::new(
            RepoTarget::new("octo", "demo", ""),
            PublishTarget {
                space_key: "DEV".into(),
                parent_page_id: "42".into(),
            },
        )
    }

    #[test]
    fn allowlist_is_exact() {
        for name in [
            "a.py", "a.js", "a.ts", "A.java", "a.c", "a.cpp", "a.cs", "a.go", "a.rb", "a.php",
        ] {
            assert!(is_source_file(name), "{name} should be allowed");
        }
        for name in ["a.txt", "README.md", "a.rs", "a.pyc", "Makefile", "a.h", "a.tsx"] {
            assert!(!is_source_file(name), "{name} should be excluded");
        }
    }

    #[test]
    fn titles_are_deterministic() {
        assert_eq!(file_page_title("main.py"), "Documentation: main.py");
        assert_eq!(structure_page_title("demo"), "Repository Structure: demo");
        assert_eq!(readme_page_title("demo"), "README: demo");
    }

    #[test]
    fn load_tasks_filters_and_keeps_order() {
        let mut state = state();
        state.load_tasks(vec![
            RawEntry::file("b.py", "b.py", "u/b"),
            RawEntry::file("notes.txt", "notes.txt", "u/n"),
            RawEntry::dir("src", "src"),
            RawEntry::file("a.py", "a.py", "u/a"),
        ]);
        let names: Vec<_> = state.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["b.py", "a.py"]);
        assert_eq!(state.stage(), Stage::Analyzing);
        assert_eq!(route(&state), Step::Analyze(0));
    }

    #[test]
    fn route_walks_the_table() {
        let mut state = state();
        assert_eq!(route(&state), Step::Enumerate);

        state.load_tasks(vec![RawEntry::file("a.py", "a.py", "u/a")]);
        assert_eq!(route(&state), Step::Analyze(0));

        state.advance_cursor();
        assert_eq!(route(&state), Step::Advance(Stage::Synthesizing));

        assert!(state.enter(Stage::Synthesizing));
        assert_eq!(route(&state), Step::Synthesize);
        assert!(state.enter(Stage::Publishing));
        assert_eq!(route(&state), Step::Publish);
        assert!(state.enter(Stage::Completed));
        assert_eq!(route(&state), Step::Halt);
        assert_eq!(state.status(), RunStatus::Completed);
    }

    #[test]
    fn zero_tasks_go_straight_to_synthesis() {
        let mut state = state();
        state.load_tasks(vec![RawEntry::file("notes.txt", "notes.txt", "u/n")]);
        assert!(state.tasks().is_empty());
        assert_eq!(route(&state), Step::Advance(Stage::Synthesizing));
    }

    #[test]
    fn failure_is_absorbing_and_set_once() {
        let mut state = state();
        state.load_tasks(vec![
            RawEntry::file("a.py", "a.py", "u/a"),
            RawEntry::file("b.py", "b.py", "u/b"),
        ]);
        state.fail(RunFailure {
            stage: Stage::Analyzing,
            message: "first".into(),
        });
        state.fail(RunFailure {
            stage: Stage::Analyzing,
            message: "second".into(),
        });
        state.advance_cursor();

        assert_eq!(state.status(), RunStatus::Failed);
        assert_eq!(state.failure().map(|f| f.message.as_str()), Some("first"));
        assert_eq!(state.cursor(), 0);
        assert_eq!(route(&state), Step::Halt);
    }

    #[test]
    fn transition_table_rejects_skips_and_exits_from_terminal() {
        assert!(Stage::Enumerating.can_enter(Stage::Analyzing));
        assert!(Stage::Synthesizing.can_enter(Stage::Failed));
        assert!(!Stage::Publishing.can_enter(Stage::Failed));
        assert!(!Stage::Enumerating.can_enter(Stage::Publishing));
        assert!(!Stage::Completed.can_enter(Stage::Failed));
        assert!(!Stage::Failed.can_enter(Stage::Analyzing));
    }

    #[test]
    fn illegal_enter_is_rejected_without_moving() {
        let mut state = state();
        assert!(!state.enter(Stage::Publishing));
        assert_eq!(state.stage(), Stage::Enumerating);
        assert_eq!(route(&state), Step::Enumerate);

        state.load_tasks(vec![]);
        assert!(state.enter(Stage::Synthesizing));
        assert!(!state.enter(Stage::Analyzing));
        assert_eq!(state.stage(), Stage::Synthesizing);
    }

    #[test]
    fn task_fields_are_write_once() {
        let mut task = FileTask::new("a.py", "a.py", None);
        task.fill_content("one".into());
        task.fill_content("two".into());
        task.fill_documentation(String::new());
        task.fill_documentation("late".into());
        assert_eq!(task.content(), Some("one"));
        assert_eq!(task.documentation(), Some(""));
        assert_eq!(task.published_documentation(), None);
    }
}
