//! High-level pipeline: orchestrates enumerate → analyze → synthesize → publish for one repository.
//!
//! This module drives a single documentation run against three injected adapters
//! (see [`crate::contract`]):
//!   - Enumerates the target path and keeps allowlisted source files, in listing order
//!   - Fetches and analyzes each file strictly in sequence
//!   - Synthesizes the repository structure overview and README once every file is analyzed
//!   - Upserts one page per documented file plus the two aggregate pages
//!
//! # Error Handling
//! Enumeration, fetch, analysis and synthesis errors are fatal: the first one is recorded on
//! the [`RunState`] and nothing after it runs, so a failed run never publishes anything.
//! Publishing is best effort: a failed upsert is recorded against its title and the
//! remaining upserts still happen.
//!
//! # Navigation
//! - Main entrypoint: [`document_repository`]
//! - Routing: [`crate::state::route`]

use tracing::{debug, error, info, warn};

use crate::contract::{
    ContentGenerator, PageUpsert, PublishTarget, PublishingTarget, RepoTarget, RepositorySource,
};
use crate::error::{FetchError, RunFailure};
use crate::state::{
    file_page_title, readme_page_title, route, structure_page_title, PageFailure, PublishSummary,
    RunState, Stage, Step,
};

/// Borrowed set of adapters for one or more runs. Holds no run state itself.
pub struct DocumentationPipeline<'a, S: ?Sized, G: ?Sized, P: ?Sized> {
    source: &'a S,
    generator: &'a G,
    publisher: &'a P,
}

impl<'a, S, G, P> DocumentationPipeline<'a, S, G, P>
where
    S: RepositorySource + ?Sized,
    G: ContentGenerator + ?Sized,
    P: PublishingTarget + ?Sized,
{
    pub fn new(source: &'a S, generator: &'a G, publisher: &'a P) -> Self {
        Self {
            source,
            generator,
            publisher,
        }
    }

    /// Run the pipeline to a terminal stage and hand back the final state.
    pub async fn run(&self, target: RepoTarget, publish_target: PublishTarget) -> RunState {
        info!(
            owner = %target.owner,
            repo = %target.name,
            path = %target.path,
            space_key = %publish_target.space_key,
            "[RUN] Starting documentation run"
        );
        let mut state = RunState::new(target, publish_target);

        loop {
            let moved = match route(&state) {
                Step::Enumerate => self.enumerate(&mut state).await,
                Step::Analyze(index) => self.analyze(&mut state, index).await,
                Step::Advance(stage) => state.enter(stage),
                Step::Synthesize => self.synthesize(&mut state).await,
                Step::Publish => self.publish(&mut state).await,
                Step::Halt => break,
            };
            if !moved {
                error!(
                    stage = state.stage().as_str(),
                    "[RUN][ERROR] Stage transition rejected, stopping run"
                );
                break;
            }
        }

        match state.failure() {
            Some(failure) => error!(
                stage = failure.stage.as_str(),
                error = %failure,
                "[RUN][ERROR] Documentation run failed"
            ),
            None => info!(
                files = state.tasks().len(),
                pages = state.publish_summary().pages.len(),
                publish_failures = state.publish_summary().failures.len(),
                "[RUN] Documentation run completed"
            ),
        }
        state
    }

    async fn enumerate(&self, state: &mut RunState) -> bool {
        info!(path = %state.target().path, "[RUN][ENUMERATE] Listing repository files");
        match self.source.list_files(state.target()).await {
            Ok(entries) => {
                let listed = entries.len();
                if !state.load_tasks(entries) {
                    return false;
                }
                info!(
                    listed,
                    tasks = state.tasks().len(),
                    "[RUN][ENUMERATE] Selected source files for analysis"
                );
            }
            Err(e) => {
                error!(error = %e, "[RUN][ERROR][ENUMERATE] Listing failed");
                state.fail(RunFailure::enumeration());
            }
        }
        true
    }

    async fn analyze(&self, state: &mut RunState, index: usize) -> bool {
        let total = state.tasks().len();
        let task = &state.tasks()[index];
        let path = task.path.clone();
        let name = task.name.clone();
        info!(file_index = index + 1, total, path = %path, "[RUN][ANALYZE] Processing file");

        if task.content().is_none() {
            let Some(locator) = task.fetch_locator.clone() else {
                error!(path = %path, "[RUN][ERROR][ANALYZE] Task has no fetch locator");
                state.fail(RunFailure::content_fetch(
                    &path,
                    &FetchError::MissingLocator(path.clone()),
                ));
                return true;
            };
            match self.source.read_file(&locator).await {
                Ok(content) => {
                    debug!(path = %path, bytes = content.len(), "[RUN][ANALYZE] Fetched content");
                    state.task_mut(index).fill_content(content);
                }
                Err(e) => {
                    error!(path = %path, error = %e, "[RUN][ERROR][ANALYZE] Content fetch failed");
                    state.fail(RunFailure::content_fetch(&path, &e));
                    return true;
                }
            }
        }

        let content = state.tasks()[index].content().unwrap_or_default();
        match self.generator.analyze_file(content, &name).await {
            Ok(documentation) => {
                debug!(
                    path = %path,
                    chars = documentation.len(),
                    "[RUN][ANALYZE] Stored documentation"
                );
                state.task_mut(index).fill_documentation(documentation);
                state.advance_cursor();
            }
            Err(e) => {
                error!(path = %path, error = %e, "[RUN][ERROR][ANALYZE] Analysis failed");
                state.fail(RunFailure::analysis(&path, &e));
            }
        }
        true
    }

    async fn synthesize(&self, state: &mut RunState) -> bool {
        let repo_name = state.target().name.clone();
        info!(
            repo = %repo_name,
            tasks = state.tasks().len(),
            "[RUN][SYNTHESIZE] Synthesizing repository documents"
        );

        let overview = match self
            .generator
            .synthesize_repository_overview(state.tasks())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "[RUN][ERROR][SYNTHESIZE] Repository overview failed");
                state.fail(RunFailure::synthesis(&e));
                return true;
            }
        };
        let readme = match self
            .generator
            .synthesize_readme(&repo_name, state.tasks())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "[RUN][ERROR][SYNTHESIZE] README synthesis failed");
                state.fail(RunFailure::synthesis(&e));
                return true;
            }
        };

        state.store_aggregates(overview, readme);
        state.enter(Stage::Publishing)
    }

    async fn publish(&self, state: &mut RunState) -> bool {
        let requests = page_requests(state);
        info!(pages = requests.len(), "[RUN][PUBLISH] Publishing pages");

        let mut summary = PublishSummary::default();
        for req in &requests {
            match self.publisher.upsert(req).await {
                Ok(receipt) => {
                    info!(
                        title = %receipt.title,
                        page_id = %receipt.page_id,
                        version = receipt.version,
                        action = ?receipt.action,
                        "[RUN][PUBLISH] Upsert succeeded"
                    );
                    summary.pages.push(receipt);
                }
                Err(e) => {
                    warn!(
                        title = %req.title,
                        error = %e,
                        "[RUN][PUBLISH] Upsert failed, continuing"
                    );
                    summary.failures.push(PageFailure {
                        title: req.title.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        state.store_publish_summary(summary);
        state.enter(Stage::Completed)
    }
}

/// Upserts for a synthesized run: documented files in task order, then the structure
/// overview and the README.
pub fn page_requests(state: &RunState) -> Vec<PageUpsert> {
    let target = state.publish_target();
    let page = |title: String, body: &str| PageUpsert {
        space_key: target.space_key.clone(),
        title,
        body: body.to_string(),
        parent_id: target.parent_page_id.clone(),
    };

    let repo_name = &state.target().name;
    let mut requests: Vec<PageUpsert> = state
        .tasks()
        .iter()
        .filter_map(|task| {
            task.published_documentation()
                .map(|doc| page(file_page_title(&task.name), doc))
        })
        .collect();
    requests.push(page(
        structure_page_title(repo_name),
        state.overview().unwrap_or_default(),
    ));
    requests.push(page(
        readme_page_title(repo_name),
        state.readme().unwrap_or_default(),
    ));
    requests
}

/// Run one documentation pass with the given adapters.
pub async fn document_repository<S, G, P>(
    source: &S,
    generator: &G,
    publisher: &P,
    target: RepoTarget,
    publish_target: PublishTarget,
) -> RunState
where
    S: RepositorySource + ?Sized,
    G: ContentGenerator + ?Sized,
    P: PublishingTarget + ?Sized,
{
    DocumentationPipeline::new(source, generator, publisher)
        .run(target, publish_target)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{demo_repository, InMemoryPublisher, ScriptedGenerator};

    #[tokio::test]
    async fn handler_reports_rejected_transition() {
        let source = demo_repository();
        let generator = ScriptedGenerator::new();
        let publisher = InMemoryPublisher::new();
        let pipeline = DocumentationPipeline::new(&source, &generator, &publisher);
        let mut state = RunState::new(
            RepoTarget::new("mock", "demo", ""),
            PublishTarget {
                space_key: "DEV".into(),
                parent_page_id: "1".into(),
            },
        );

        // Publishing straight from Enumerating is not a legal transition.
        assert!(!pipeline.publish(&mut state).await);
        assert_eq!(state.stage(), Stage::Enumerating);
        assert!(!pipeline.synthesize(&mut state).await);
        assert_eq!(state.stage(), Stage::Enumerating);

        assert!(pipeline.enumerate(&mut state).await);
        assert_eq!(state.stage(), Stage::Analyzing);
    }
}
