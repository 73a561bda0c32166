//! Task chain execution engine
//!
//! Drives items from a resumable source through an ordered list of tasks.
//! Every item runs the tasks strictly in registration order; a task returning
//! [`Decision::Discard`] abandons the item unless later re-emitted by a
//! fresh run. The engine persists a run checkpoint at every task boundary and
//! the accepted-results collection after every accepted item, so an
//! interrupted run resumes at the exact item and task where it stopped
//! without re-doing completed work.

pub mod checkpoint;
pub mod item;
pub mod results;
pub mod task;


pub use checkpoint::{
    chain_fingerprint, CheckpointManager, ResumePoint, RunCheckpoint, CHECKPOINT_VERSION,
};
pub use item::{ChainItem, CLONE_PROPERTY};
pub use results::ResultsWriter;
pub use task::{Decision, Task, TaskOutcome};

use crate::source::{ItemSource, ItemStream, SourceCursor, SourcedItem};
use anyhow::{anyhow, bail, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Terminal status of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Accepted,
    /// Vetoed by the named task. The property bag on the outcome still holds
    /// everything recorded up to and including that task.
    Rejected { task: String },
}

/// Passed to the per-item callback once an item reaches a terminal status.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub item: ChainItem,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub accepted: usize,
    pub rejected: usize,
}

enum StartState {
    Fresh,
    Boundary(SourceCursor),
    MidItem {
        cursor: SourceCursor,
        item: ChainItem,
        task_index: usize,
        task_cursor: Option<Value>,
    },
}

/// The execution engine: an ordered list of tasks plus checkpoint and result
/// persistence.
pub struct TaskChain {
    name: String,
    tasks: Vec<Arc<dyn Task>>,
    checkpoints: CheckpointManager,
    results: ResultsWriter,
}

impl TaskChain {
    pub fn new(name: &str, state_dir: &Path, results_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            tasks: Vec::new(),
            checkpoints: CheckpointManager::new(state_dir.to_path_buf()),
            results: ResultsWriter::new(name, results_dir),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a task. Tasks run in registration order.
    pub fn register(&mut self, task: Arc<dyn Task>) {
        self.tasks.push(task);
    }

    pub fn results(&self) -> &ResultsWriter {
        &self.results
    }

    fn fingerprint(&self) -> String {
        let names: Vec<&str> = self.tasks.iter().map(|t| t.name()).collect();
        chain_fingerprint(&self.name, &names)
    }

    fn task_index(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.name() == name)
    }

    /// Run the chain to completion over `source`.
    pub async fn run(&mut self, source: &dyn ItemSource) -> Result<RunSummary> {
        self.run_with(source, |_| {}).await
    }

    /// Run the chain to completion, invoking `on_item` after every item
    /// reaches a terminal status.
    pub async fn run_with<F>(&mut self, source: &dyn ItemSource, mut on_item: F) -> Result<RunSummary>
    where
        F: FnMut(&ItemOutcome),
    {
        self.validate_tasks()?;
        let fingerprint = self.fingerprint();

        let start = match self.checkpoints.load(&self.name).await? {
            Some(cp) if cp.fingerprint == fingerprint => {
                info!("Resuming chain {} from checkpoint", self.name);
                self.results.load_existing().await?;
                match cp.resume {
                    ResumePoint::ItemBoundary { cursor } => StartState::Boundary(cursor),
                    ResumePoint::MidItem {
                        cursor,
                        task,
                        task_cursor,
                        item,
                    } => {
                        let task_index = self.task_index(&task).ok_or_else(|| {
                            anyhow!("checkpoint for chain {} references unknown task {task}", self.name)
                        })?;
                        StartState::MidItem {
                            cursor,
                            item: *item,
                            task_index,
                            task_cursor,
                        }
                    }
                }
            }
            Some(_) => {
                warn!(
                    "Chain {} changed since its checkpoint was written, starting fresh",
                    self.name
                );
                self.results.reset().await?;
                StartState::Fresh
            }
            None => {
                self.results.reset().await?;
                StartState::Fresh
            }
        };

        let mut summary = RunSummary::default();
        let cursor = match start {
            StartState::Fresh => None,
            StartState::Boundary(cursor) => Some(cursor),
            StartState::MidItem {
                cursor,
                item,
                task_index,
                task_cursor,
            } => {
                // Finish the in-flight item before touching the source again.
                let outcome = self
                    .process_item(item, task_index, task_cursor, cursor)
                    .await?;
                self.complete_item(outcome, cursor, &mut summary, &mut on_item)
                    .await?;
                Some(cursor)
            }
        };

        let mut stream = source.produce(cursor).await?;
        while let Some(SourcedItem { item, cursor }) = stream.next_item().await? {
            debug!("Processing {} ({})", item.repo.full_name, item.key());
            let outcome = self.process_item(item, 0, None, cursor).await?;
            self.complete_item(outcome, cursor, &mut summary, &mut on_item)
                .await?;
        }

        self.checkpoints.delete(&self.name).await?;
        info!(
            "Chain {} complete: {} accepted, {} rejected",
            self.name, summary.accepted, summary.rejected
        );
        Ok(summary)
    }

    /// Run one item from `start` onwards. The sub-checkpoint returned by each
    /// task is handed to the next one, and the checkpoint written before
    /// every invocation records exactly the task about to run, so a crash
    /// loses at most that task's own progress.
    async fn process_item(
        &mut self,
        mut item: ChainItem,
        start: usize,
        mut task_cursor: Option<Value>,
        cursor: SourceCursor,
    ) -> Result<ItemOutcome> {
        let fingerprint = self.fingerprint();
        for index in start..self.tasks.len() {
            let task = Arc::clone(&self.tasks[index]);
            self.checkpoints
                .save(&RunCheckpoint::new(
                    self.name.clone(),
                    fingerprint.clone(),
                    ResumePoint::MidItem {
                        cursor,
                        task: task.name().to_string(),
                        task_cursor: task_cursor.clone(),
                        item: Box::new(item.clone()),
                    },
                ))
                .await?;

            let outcome = task.apply(item, task_cursor.take()).await?;
            item = outcome.item;
            task_cursor = outcome.checkpoint;

            if outcome.decision == Decision::Discard {
                debug!("Item {} rejected by task {}", item.key(), task.name());
                return Ok(ItemOutcome {
                    item,
                    status: ItemStatus::Rejected {
                        task: task.name().to_string(),
                    },
                });
            }
        }
        Ok(ItemOutcome {
            item,
            status: ItemStatus::Accepted,
        })
    }

    /// Persist the outcome of a finished item and advance the checkpoint to
    /// the next item boundary. Results are written first: a crash between the
    /// two writes re-processes the item and overwrites the same key.
    async fn complete_item<F>(
        &mut self,
        outcome: ItemOutcome,
        cursor: SourceCursor,
        summary: &mut RunSummary,
        on_item: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&ItemOutcome),
    {
        match &outcome.status {
            ItemStatus::Accepted => {
                self.results.record(outcome.item.clone()).await?;
                summary.accepted += 1;
            }
            ItemStatus::Rejected { .. } => {
                summary.rejected += 1;
            }
        }
        self.checkpoints
            .save(&RunCheckpoint::new(
                self.name.clone(),
                self.fingerprint(),
                ResumePoint::ItemBoundary { cursor },
            ))
            .await?;
        on_item(&outcome);
        Ok(())
    }

    fn validate_tasks(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.name()) {
                bail!(
                    "duplicate task name '{}' in chain {}",
                    task.name(),
                    self.name
                );
            }
        }
        Ok(())
    }
}
