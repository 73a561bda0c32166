//! Run checkpoint management for resume capability
//!
//! A run checkpoint pins the position a chain can safely resume from: either
//! the boundary before the next item, or a specific task of an in-flight item
//! together with that task's sub-checkpoint and the item snapshot.

use super::item::ChainItem;
use crate::source::SourceCursor;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

/// Version for checkpoint format compatibility
pub const CHECKPOINT_VERSION: u32 = 1;

/// A position it is safe to resume from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "position", rename_all = "snake_case")]
pub enum ResumePoint {
    /// Start the next item the source emits from `cursor`.
    ItemBoundary { cursor: SourceCursor },
    /// Retry `task` on the snapshotted in-flight item with its last
    /// sub-checkpoint, then continue the source from `cursor` (which already
    /// points past the in-flight item).
    MidItem {
        cursor: SourceCursor,
        task: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_cursor: Option<Value>,
        item: Box<ChainItem>,
    },
}

/// Complete persisted run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCheckpoint {
    /// Chain the checkpoint belongs to
    pub chain: String,
    /// Fingerprint of the chain definition at checkpoint time
    pub fingerprint: String,
    pub resume: ResumePoint,
    pub timestamp: DateTime<Utc>,
    /// Checkpoint format version
    pub version: u32,
}

impl RunCheckpoint {
    pub fn new(chain: String, fingerprint: String, resume: ResumePoint) -> Self {
        Self {
            chain,
            fingerprint,
            resume,
            timestamp: Utc::now(),
            version: CHECKPOINT_VERSION,
        }
    }
}

/// Fingerprint of a chain definition: its name plus the ordered task names.
/// A checkpoint written by a different definition is not resumed.
pub fn chain_fingerprint<S: AsRef<str>>(name: &str, task_names: &[S]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    for task in task_names {
        hasher.update([0u8]);
        hasher.update(task.as_ref().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Manager for run checkpoints
pub struct CheckpointManager {
    /// Base directory for checkpoint files
    storage_path: PathBuf,
}

impl CheckpointManager {
    pub fn new(storage_path: PathBuf) -> Self {
        Self { storage_path }
    }

    /// Persist a checkpoint with an atomic write.
    pub async fn save(&self, checkpoint: &RunCheckpoint) -> Result<()> {
        let path = self.checkpoint_path(&checkpoint.chain);
        let temp_path = path.with_extension("tmp");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create checkpoint directory")?;
        }

        let json = serde_json::to_string_pretty(checkpoint)?;
        fs::write(&temp_path, json)
            .await
            .context("Failed to write checkpoint to temp file")?;
        fs::rename(temp_path, &path)
            .await
            .context("Failed to move checkpoint to final location")?;

        debug!("Saved checkpoint for chain {}", checkpoint.chain);
        Ok(())
    }

    /// Load the checkpoint for `chain`, or `None` when no prior run left one.
    pub async fn load(&self, chain: &str) -> Result<Option<RunCheckpoint>> {
        let path = self.checkpoint_path(chain);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .context("Failed to read checkpoint file")?;
        let checkpoint: RunCheckpoint =
            serde_json::from_str(&content).context("Failed to parse checkpoint")?;

        if checkpoint.version > CHECKPOINT_VERSION {
            return Err(anyhow!(
                "Checkpoint version {} is newer than supported version {}",
                checkpoint.version,
                CHECKPOINT_VERSION
            ));
        }

        Ok(Some(checkpoint))
    }

    /// Delete the checkpoint after a run completes.
    pub async fn delete(&self, chain: &str) -> Result<()> {
        let path = self.checkpoint_path(chain);
        if path.exists() {
            fs::remove_file(path)
                .await
                .context("Failed to delete checkpoint")?;
            info!("Deleted checkpoint for completed chain {chain}");
        }
        Ok(())
    }

    fn checkpoint_path(&self, chain: &str) -> PathBuf {
        self.storage_path.join(format!("{chain}.checkpoint.json"))
    }
}
