//! Materialize step: clone the repository to a local folder

use crate::chain::{ChainItem, Task, TaskOutcome, CLONE_PROPERTY};
use crate::subprocess::{GitRunner, SubprocessManager};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{info, warn};

/// Clones the repository into its own subfolder under `dest` and records the
/// local path for later filesystem-based tasks. This task never vetoes the
/// chain: a failed clone is recorded as an invalid property and processing
/// continues.
pub struct CloneTask {
    dest: PathBuf,
    subprocess: SubprocessManager,
}

impl CloneTask {
    pub fn new(dest: impl Into<PathBuf>, subprocess: SubprocessManager) -> Self {
        Self {
            dest: dest.into(),
            subprocess,
        }
    }
}

#[async_trait]
impl Task for CloneTask {
    fn name(&self) -> &str {
        CLONE_PROPERTY
    }

    async fn apply(&self, mut item: ChainItem, _checkpoint: Option<Value>) -> Result<TaskOutcome> {
        let target = self.dest.join(item.repo.full_name.replace('/', "_"));

        // A re-run after a crash reuses the clone left on disk.
        if target.exists() {
            info!(
                "Reusing existing clone of {} at {}",
                item.repo.full_name,
                target.display()
            );
            item.set_property(
                CLONE_PROPERTY,
                json!({ "valid": true, "full_path": target.to_string_lossy() }),
            );
            return Ok(TaskOutcome::advance(item));
        }

        let url = item
            .repo
            .clone_url
            .clone()
            .unwrap_or_else(|| format!("https://github.com/{}.git", item.repo.full_name));

        info!("Cloning {} to {}", item.repo.full_name, target.display());
        match self.subprocess.git().clone_repository(&url, &target).await {
            Ok(()) => {
                item.set_property(
                    CLONE_PROPERTY,
                    json!({ "valid": true, "full_path": target.to_string_lossy() }),
                );
            }
            Err(err) => {
                warn!("Clone of {} failed: {err}", item.repo.full_name);
                item.set_property(
                    CLONE_PROPERTY,
                    json!({ "valid": false, "error": err.to_string() }),
                );
            }
        }
        Ok(TaskOutcome::advance(item))
    }
}
