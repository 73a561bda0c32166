//! Line-count threshold check over the materialized repository

use crate::chain::{ChainItem, Task, TaskOutcome};
use crate::walk;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

/// Which files count toward the total, by ancestor-folder name.
pub enum AncestorFilter {
    /// Only files with an ancestor matching one of the names (empty = all).
    Include(Vec<String>),
    /// Files with an ancestor matching `parents` (empty = all), minus those
    /// with an ancestor matching `exclude`.
    Exclude {
        parents: Vec<String>,
        exclude: Vec<String>,
    },
}

/// Sums the line count of matching files under the clone path and succeeds
/// when the total strictly exceeds the threshold. The default threshold of -1
/// always succeeds.
pub struct CheckLocTask {
    name: String,
    extension: String,
    filter: AncestorFilter,
    threshold: i64,
    optional: bool,
}

impl CheckLocTask {
    pub fn new(
        name: &str,
        extension: &str,
        filter: AncestorFilter,
        threshold: i64,
        optional: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            extension: extension.to_string(),
            filter,
            threshold,
            optional,
        }
    }
}

#[async_trait]
impl Task for CheckLocTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, mut item: ChainItem, _checkpoint: Option<Value>) -> Result<TaskOutcome> {
        // A failed clone leaves no path; that is a failed check, not a crash.
        let Some(root) = item.clone_path() else {
            item.set_property(&self.name, json!({ "valid": false, "loc": 0 }));
            return Ok(TaskOutcome::gated(item, self.optional));
        };

        let files = walk::with_extension(walk::walk_files(&root), &self.extension);
        let files = match &self.filter {
            AncestorFilter::Include(parents) => walk::with_ancestor(files, &root, parents),
            AncestorFilter::Exclude { parents, exclude } => {
                walk::without_ancestor(files, &root, parents, exclude)
            }
        };

        let loc: usize = files.iter().map(|file| walk::count_lines(file)).sum();
        let valid = loc as i64 > self.threshold;
        info!(
            "Total {} loc in {}: {loc}",
            self.extension, item.repo.full_name
        );
        item.set_property(&self.name, json!({ "valid": valid, "loc": loc }));
        Ok(TaskOutcome::gated(item, valid || self.optional))
    }
}
