//! Task contract: one stage of per-item processing

use super::item::ChainItem;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Whether the chain keeps processing an item after a task returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    /// The item is abandoned: later tasks never run and it is excluded from
    /// the accepted-results collection.
    Discard,
}

/// Result triple of one task invocation: the updated item, the task's new
/// sub-checkpoint, and the continuation decision.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub item: ChainItem,
    pub checkpoint: Option<Value>,
    pub decision: Decision,
}

impl TaskOutcome {
    pub fn advance(item: ChainItem) -> Self {
        Self {
            item,
            checkpoint: None,
            decision: Decision::Continue,
        }
    }

    pub fn discard(item: ChainItem) -> Self {
        Self {
            item,
            checkpoint: None,
            decision: Decision::Discard,
        }
    }

    /// Continue when `pass` holds, discard otherwise.
    pub fn gated(item: ChainItem, pass: bool) -> Self {
        if pass {
            Self::advance(item)
        } else {
            Self::discard(item)
        }
    }

    pub fn with_checkpoint(mut self, checkpoint: Value) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }
}

/// A unit of work bound to a unique name within its chain.
///
/// Tasks must be safe to re-invoke with a stale sub-checkpoint after a crash:
/// re-running may refresh this task's own property but must not disturb
/// entries written by other tasks. Errors returned here are fatal to the run;
/// expected failures belong in the outcome as `Decision::Discard`.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    async fn apply(&self, item: ChainItem, checkpoint: Option<Value>) -> Result<TaskOutcome>;
}
