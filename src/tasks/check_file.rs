//! Existence check: does the repository contain files matching a query?

use crate::chain::{ChainItem, Task, TaskOutcome};
use crate::github::{FileQuery, QueryBackend};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Runs a code search scoped to the item's repository and records the
/// matching files. A non-optional check with no matches vetoes the item.
pub struct CheckFileTask {
    name: String,
    query: FileQuery,
    optional: bool,
    backend: Arc<dyn QueryBackend>,
}

impl CheckFileTask {
    pub fn new(
        name: &str,
        query: FileQuery,
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
impl Task for CheckFileTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, mut item: ChainItem, _checkpoint: Option<Value>) -> Result<TaskOutcome> {
        info!(
            "Testing for '{}' in {}",
            self.query.to_query(&item.repo.full_name),
            item.repo.full_name
        );
        let files = self
            .backend
            .search_code(&item.repo.full_name, &self.query)
            .await?;
        let valid = !files.is_empty();
        item.set_property(&self.name, json!({ "valid": valid, "files": files }));
        Ok(TaskOutcome::gated(item, valid || self.optional))
    }
}
