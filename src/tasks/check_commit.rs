//! History check: does a commit matching the criteria exist?

use crate::chain::{ChainItem, Task, TaskOutcome};
use crate::github::{CommitQuery, QueryBackend};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Runs a commit search scoped to the item's repository and records the
/// matching commits. Same continue semantics as the file check.
pub struct CheckCommitTask {
    name: String,
    query: CommitQuery,
    optional: bool,
    backend: Arc<dyn QueryBackend>,
}

impl CheckCommitTask {
    pub fn new(
        name: &str,
        query: CommitQuery,
        optional: bool,
        backend: Arc<dyn QueryBackend>,
    ) -> Self {
        Self {
            name: name.to_string(),
            query,
            optional,
            backend,
        }
    }
}

#[async_trait]
impl Task for CheckCommitTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, mut item: ChainItem, _checkpoint: Option<Value>) -> Result<TaskOutcome> {
        info!(
            "Testing for commits '{}' in {}",
            self.query.to_query(&item.repo.full_name),
            item.repo.full_name
        );
        let commits = self
            .backend
            .search_commits(&item.repo.full_name, &self.query)
            .await?;
        let valid = !commits.is_empty();
        item.set_property(&self.name, json!({ "valid": valid, "commits": commits }));
        Ok(TaskOutcome::gated(item, valid || self.optional))
    }
}
