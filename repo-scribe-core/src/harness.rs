//! Deterministic in-memory adapters.
//!
//! Drop-in substitutes for the three network adapters, used by the test suite and by the
//! CLI's `--mock` mode. They satisfy the same contracts as the real clients: the publisher
//! keeps pages keyed by `(space, title)` and bumps the version on every update, so running
//! the pipeline twice against the same publisher exercises the idempotent-upsert path.
//!
//! Each double can be told to fail in one specific place (a listing, a locator, a filename,
//! a page title) and records the calls it received.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::contract::{
    ContentGenerator, PageReceipt, PageUpsert, PublishingTarget, RawEntry, RepoTarget,
    RepositorySource, UpsertAction,
};
use crate::error::{AnalysisError, FetchError, PublishError};
use crate::state::FileTask;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Repository listings keyed by path, file contents keyed by locator.
#[derive(Default)]
pub struct InMemorySource {
    listings: HashMap<String, Vec<RawEntry>>,
    contents: HashMap<String, String>,
    fail_listing: bool,
    failing_locators: HashSet<String>,
    reads: Mutex<Vec<String>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, path: &str, entries: Vec<RawEntry>) -> Self {
        self.listings.insert(path.to_string(), entries);
        self
    }

    pub fn with_content(mut self, locator: &str, content: &str) -> Self {
        self.contents.insert(locator.to_string(), content.to_string());
        self
    }

    /// Every `list_files` call fails.
    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// `read_file` fails for this locator.
    pub fn failing_read(mut self, locator: &str) -> Self {
        self.failing_locators.insert(locator.to_string());
        self
    }

    /// Locators passed to `read_file`, in call order.
    pub fn reads(&self) -> Vec<String> {
        lock(&self.reads).clone()
    }
}

#[async_trait]
impl RepositorySource for InMemorySource {
    async fn list_files(&self, target: &RepoTarget) -> Result<Vec<RawEntry>, FetchError> {
        if self.fail_listing {
            return Err(FetchError::Http {
                status: 500,
                url: format!("memory://{}/{}/{}", target.owner, target.name, target.path),
            });
        }
        self.listings
            .get(&target.path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(target.path.clone()))
    }

    async fn read_file(&self, locator: &str) -> Result<String, FetchError> {
        lock(&self.reads).push(locator.to_string());
        if self.failing_locators.contains(locator) {
            return Err(FetchError::Http {
                status: 500,
                url: locator.to_string(),
            });
        }
        self.contents
            .get(locator)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(locator.to_string()))
    }
}

/// Produces fixed documentation text derived from its inputs.
#[derive(Default)]
pub struct ScriptedGenerator {
    failing_file: Option<String>,
    empty_file: Option<String>,
    fail_synthesis: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `analyze_file` fails for this filename.
    pub fn failing_on(mut self, filename: &str) -> Self {
        self.failing_file = Some(filename.to_string());
        self
    }

    /// `analyze_file` returns an empty string for this filename.
    pub fn empty_for(mut self, filename: &str) -> Self {
        self.empty_file = Some(filename.to_string());
        self
    }

    /// Both synthesis calls fail.
    pub fn failing_synthesis(mut self) -> Self {
        self.fail_synthesis = true;
        self
    }

    /// Calls received, as `analyze:<file>`, `overview` or `readme:<repo>`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn file_list(tasks: &[FileTask]) -> String {
        tasks
            .iter()
            .map(|task| format!("- `{}`\n", task.path))
            .collect()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn analyze_file(&self, content: &str, filename: &str) -> Result<String, AnalysisError> {
        lock(&self.calls).push(format!("analyze:{filename}"));
        if self.failing_file.as_deref() == Some(filename) {
            return Err(AnalysisError::Service(format!(
                "scripted failure for {filename}"
            )));
        }
        if self.empty_file.as_deref() == Some(filename) {
            return Ok(String::new());
        }
        Ok(format!(
            "# File: {filename}\n\n## Overview\nThis file has {} lines of code.\n",
            content.lines().count()
        ))
    }

    async fn synthesize_repository_overview(
        &self,
        tasks: &[FileTask],
    ) -> Result<String, AnalysisError> {
        lock(&self.calls).push("overview".to_string());
        if self.fail_synthesis {
            return Err(AnalysisError::Service("scripted synthesis failure".into()));
        }
        Ok(format!(
            "# Repository Structure Analysis\n\n## Key Components\n{}",
            Self::file_list(tasks)
        ))
    }

    async fn synthesize_readme(
        &self,
        repo_name: &str,
        tasks: &[FileTask],
    ) -> Result<String, AnalysisError> {
        lock(&self.calls).push(format!("readme:{repo_name}"));
        if self.fail_synthesis {
            return Err(AnalysisError::Service("scripted synthesis failure".into()));
        }
        Ok(format!(
            "# {repo_name}\n\n## Project Structure\n{}",
            Self::file_list(tasks)
        ))
    }
}

/// A page held by [`InMemoryPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub id: String,
    pub space_key: String,
    pub title: String,
    pub body: String,
    pub parent_id: String,
    pub version: u64,
}

#[derive(Default)]
struct PublisherStore {
    pages: BTreeMap<(String, String), StoredPage>,
    created: usize,
}

/// Pages keyed by `(space, title)`, with upsert semantics.
#[derive(Default)]
pub struct InMemoryPublisher {
    store: Mutex<PublisherStore>,
    failing_titles: HashSet<String>,
    calls: Mutex<Vec<PageUpsert>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts of this title fail and leave the store untouched.
    pub fn failing_title(mut self, title: &str) -> Self {
        self.failing_titles.insert(title.to_string());
        self
    }

    pub fn page(&self, space_key: &str, title: &str) -> Option<StoredPage> {
        lock(&self.store)
            .pages
            .get(&(space_key.to_string(), title.to_string()))
            .cloned()
    }

    pub fn pages(&self) -> Vec<StoredPage> {
        lock(&self.store).pages.values().cloned().collect()
    }

    /// Every upsert received, including failed ones, in call order.
    pub fn calls(&self) -> Vec<PageUpsert> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl PublishingTarget for InMemoryPublisher {
    async fn upsert(&self, req: &PageUpsert) -> Result<PageReceipt, PublishError> {
        lock(&self.calls).push(req.clone());
        if self.failing_titles.contains(&req.title) {
            return Err(PublishError::Rejected {
                title: req.title.clone(),
                reason: "scripted failure".into(),
            });
        }

        let mut store = lock(&self.store);
        let key = (req.space_key.clone(), req.title.clone());
        if let Some(page) = store.pages.get_mut(&key) {
            page.body = req.body.clone();
            page.version += 1;
            return Ok(PageReceipt {
                page_id: page.id.clone(),
                title: page.title.clone(),
                version: page.version,
                action: UpsertAction::Updated,
            });
        }

        store.created += 1;
        let page = StoredPage {
            id: format!("page-{}", store.created),
            space_key: req.space_key.clone(),
            title: req.title.clone(),
            body: req.body.clone(),
            parent_id: req.parent_id.clone(),
            version: 1,
        };
        let receipt = PageReceipt {
            page_id: page.id.clone(),
            title: page.title.clone(),
            version: page.version,
            action: UpsertAction::Created,
        };
        store.pages.insert(key, page);
        Ok(receipt)
    }
}

const DEMO_APP_PY: &str = r#"import streamlit as st
from src.main import process_data

def main():
    st.title("Sample App")
    data = st.file_uploader("Upload data")
    if data:
        result = process_data(data)
        st.write(result)

if __name__ == "__main__":
    main()
"#;

const DEMO_MAIN_PY: &str = r#"from .utils import clean_data, analyze_data
from .config import get_config

def process_data(data_file):
    """Process the uploaded data file and return analysis results"""
    config = get_config()
    data = clean_data(data_file, config['cleaning_params'])
    return analyze_data(data, config['analysis_params'])
"#;

const DEMO_CONFIG_PY: &str = r#"def get_config():
    """Return application configuration"""
    return {
        'cleaning_params': {'remove_duplicates': True, 'fill_missing': 'mean'},
        'analysis_params': {'method': 'regression', 'confidence_level': 0.95},
    }
"#;

const DEMO_UTILS_PY: &str = r#"def clean_data(data_file, params):
    """Clean the input data according to the parameters"""
    return data_file

def analyze_data(data, params):
    """Analyze the data according to the parameters"""
    return {'status': 'success', 'method': params['method']}
"#;

/// A small sample repository: a root listing with mixed file types and a `src` directory.
pub fn demo_repository() -> InMemorySource {
    let locator = |path: &str| format!("mock://download/{path}");
    InMemorySource::new()
        .with_listing(
            "",
            vec![
                RawEntry::file("app.py", "app.py", &locator("app.py")),
                RawEntry::file(
                    "requirements.txt",
                    "requirements.txt",
                    &locator("requirements.txt"),
                ),
                RawEntry::dir("src", "src"),
                RawEntry::file("README.md", "README.md", &locator("README.md")),
            ],
        )
        .with_listing(
            "src",
            vec![
                RawEntry::file("main.py", "src/main.py", &locator("src/main.py")),
                RawEntry::file("config.py", "src/config.py", &locator("src/config.py")),
                RawEntry::file("utils.py", "src/utils.py", &locator("src/utils.py")),
            ],
        )
        .with_content(&locator("app.py"), DEMO_APP_PY)
        .with_content(&locator("requirements.txt"), "streamlit\n")
        .with_content(&locator("README.md"), "# demo\n")
        .with_content(&locator("src/main.py"), DEMO_MAIN_PY)
        .with_content(&locator("src/config.py"), DEMO_CONFIG_PY)
        .with_content(&locator("src/utils.py"), DEMO_UTILS_PY)
}
