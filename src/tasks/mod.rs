//! Domain task factories and the fluent chain builder
//!
//! [`ChainBuilder`] is the convenience surface for assembling a chain of
//! repository checks; each builder method registers a concrete [`Task`]
//! implementation from this module.

pub mod check_commit;
pub mod check_file;
pub mod clone;
pub mod command;
pub mod loc;
pub mod property;

#[cfg(test)]
mod tests;

pub use check_commit::CheckCommitTask;
pub use check_file::CheckFileTask;
pub use clone::CloneTask;
pub use command::{
    default_condition, CheckCommandOnFilesTask, CheckCommandTask, CommandFn, CommandResult,
    ConditionFn,
};
pub use loc::{AncestorFilter, CheckLocTask};
pub use property::{CheckPropertyTask, PredicateFn};

use crate::chain::{ChainItem, ItemOutcome, RunSummary, Task, TaskChain};
use crate::config::{ChainConfig, SourceConfig, StepConfig};
use crate::github::{CommitQuery, FileQuery, QueryBackend, RepoQuery};
use crate::source::{FileSource, ItemSource, QuerySource};
use crate::subprocess::SubprocessManager;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Assembles a [`TaskChain`] over a repository source. Checks run in the
/// order they are added; repositories that fail a non-optional check are
/// dropped from the persisted results.
pub struct ChainBuilder {
    name: String,
    state_dir: PathBuf,
    results_dir: PathBuf,
    source: Box<dyn ItemSource>,
    backend: Arc<dyn QueryBackend>,
    subprocess: SubprocessManager,
    tasks: Vec<Arc<dyn Task>>,
}

impl ChainBuilder {
    /// Chain over a live repository search.
    pub fn query(
        name: &str,
        query: RepoQuery,
        backend: Arc<dyn QueryBackend>,
        subprocess: SubprocessManager,
    ) -> Self {
        let source = Box::new(QuerySource::new(Arc::clone(&backend), query));
        Self::with_source(name, source, backend, subprocess)
    }

    /// Chain replaying previously-serialized query results from disk.
    pub fn file(
        name: &str,
        path: impl Into<PathBuf>,
        backend: Arc<dyn QueryBackend>,
        subprocess: SubprocessManager,
    ) -> Self {
        Self::with_source(name, Box::new(FileSource::new(path)), backend, subprocess)
    }

    /// Chain over an arbitrary source.
    pub fn with_source(
        name: &str,
        source: Box<dyn ItemSource>,
        backend: Arc<dyn QueryBackend>,
        subprocess: SubprocessManager,
    ) -> Self {
        Self {
            name: name.to_string(),
            state_dir: PathBuf::from(".reposift"),
            results_dir: PathBuf::from("."),
            source,
            backend,
            subprocess,
            tasks: Vec::new(),
        }
    }

    /// Build a chain from a validated configuration. Configuration problems
    /// are fatal here, before any item is processed.
    pub fn from_config(
        config: ChainConfig,
        backend: Arc<dyn QueryBackend>,
        subprocess: SubprocessManager,
    ) -> Result<Self> {
        config.validate()?;

        let source: Box<dyn ItemSource> = match &config.source {
            SourceConfig::Query { query } => {
                Box::new(QuerySource::new(Arc::clone(&backend), query.clone()))
            }
            SourceConfig::File { path } => Box::new(FileSource::new(path.clone())),
        };

        let mut builder = Self::with_source(&config.name, source, backend, subprocess)
            .state_dir(config.state_dir.clone())
            .results_dir(config.results_dir.clone());

        for step in config.steps {
            builder = match step {
                StepConfig::CheckFile {
                    name,
                    query,
                    optional,
                } => builder.check_file(query, &name, optional),
                StepConfig::CheckCommit {
                    name,
                    query,
                    optional,
                } => builder.check_commit(query, &name, optional),
                StepConfig::Clone { dest } => builder.clone_to(dest),
                StepConfig::CheckCommand {
                    name,
                    command,
                    optional,
                } => {
                    let template = command.clone();
                    builder.check_command(
                        Box::new(move |_: &ChainItem| template.clone()),
                        &name,
                        default_condition(),
                        optional,
                    )
                }
                StepConfig::CheckCommandOnFiles {
                    name,
                    files_property,
                    command,
                    optional,
                } => builder.check_command_on_files(
                    &files_property,
                    &command,
                    &name,
                    optional,
                    default_condition(),
                ),
                StepConfig::CheckLoc {
                    name,
                    extension,
                    parents,
                    exclude,
                    threshold,
                    optional,
                } => {
                    if exclude.is_empty() {
                        builder.check_loc(parents, &extension, &name, threshold, optional)
                    } else {
                        builder.check_loc_exclude(
                            parents, exclude, &extension, &name, threshold, optional,
                        )
                    }
                }
            };
        }
        Ok(builder)
    }

    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Require files matching `query` to exist in the repository. Records the
    /// matching files under `name`.
    pub fn check_file(mut self, query: FileQuery, name: &str, optional: bool) -> Self {
        self.tasks.push(Arc::new(CheckFileTask::new(
            name,
            query,
            optional,
            Arc::clone(&self.backend),
        )));
        self
    }

    /// Require a commit matching `query` to exist. Records the matching
    /// commits under `name`.
    pub fn check_commit(mut self, query: CommitQuery, name: &str, optional: bool) -> Self {
        self.tasks.push(Arc::new(CheckCommitTask::new(
            name,
            query,
            optional,
            Arc::clone(&self.backend),
        )));
        self
    }

    /// Clone the repository into its own subfolder under `dest`. Never fails
    /// the chain; records the local path under `clone`.
    pub fn clone_to(mut self, dest: impl Into<PathBuf>) -> Self {
        self.tasks
            .push(Arc::new(CloneTask::new(dest, self.subprocess.clone())));
        self
    }

    /// Gate on an arbitrary predicate of the item. A property is recorded
    /// only when `name` is given.
    pub fn check_property(mut self, predicate: PredicateFn, name: Option<&str>) -> Self {
        self.tasks
            .push(Arc::new(CheckPropertyTask::new(predicate, name)));
        self
    }

    /// Run a command derived from the item and judge the captured result
    /// with `condition`.
    pub fn check_command(
        mut self,
        command: CommandFn,
        name: &str,
        condition: ConditionFn,
        optional: bool,
    ) -> Self {
        self.tasks.push(Arc::new(CheckCommandTask::new(
            name,
            command,
            condition,
            optional,
            self.subprocess.clone(),
        )));
        self
    }

    /// Run `command` once in each distinct parent folder of the files
    /// recorded by the earlier `files_property` check.
    pub fn check_command_on_files(
        mut self,
        files_property: &str,
        command: &str,
        name: &str,
        optional: bool,
        condition: ConditionFn,
    ) -> Self {
        self.tasks.push(Arc::new(CheckCommandOnFilesTask::new(
            name,
            files_property,
            command,
            condition,
            optional,
            self.subprocess.clone(),
        )));
        self
    }

    /// Require more than `threshold` lines across files with the extension
    /// and an ancestor folder matching one of `parents`.
    pub fn check_loc(
        mut self,
        parents: Vec<String>,
        extension: &str,
        name: &str,
        threshold: i64,
        optional: bool,
    ) -> Self {
        self.tasks.push(Arc::new(CheckLocTask::new(
            name,
            extension,
            AncestorFilter::Include(parents),
            threshold,
            optional,
        )));
        self
    }

    /// Like [`check_loc`](Self::check_loc), additionally dropping files with
    /// an ancestor folder matching one of `exclude`.
    pub fn check_loc_exclude(
        mut self,
        parents: Vec<String>,
        exclude: Vec<String>,
        extension: &str,
        name: &str,
        threshold: i64,
        optional: bool,
    ) -> Self {
        self.tasks.push(Arc::new(CheckLocTask::new(
            name,
            extension,
            AncestorFilter::Exclude { parents, exclude },
            threshold,
            optional,
        )));
        self
    }

    /// Run the chain to completion.
    pub async fn run(self) -> Result<RunSummary> {
        self.run_with(|_| {}).await
    }

    /// Run the chain to completion, invoking `on_item` per finished item.
    pub async fn run_with<F>(self, on_item: F) -> Result<RunSummary>
    where
        F: FnMut(&ItemOutcome),
    {
        let mut chain = TaskChain::new(&self.name, &self.state_dir, &self.results_dir);
        for task in self.tasks {
            chain.register(task);
        }
        chain.run_with(&*self.source, on_item).await
    }
}
