//! Resumable item sources feeding a task chain
//!
//! A source produces a lazy stream of items together with the cursor that
//! resumes emission *after* each item: calling [`ItemSource::produce`] with
//! the cursor recorded alongside the k-th item yields a stream starting at
//! item k+1.

pub mod file;
pub mod query;

pub use file::FileSource;
pub use query::QuerySource;

use crate::chain::ChainItem;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque position within a source's item sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCursor {
    /// Index of the next item to emit.
    pub index: usize,
}

/// One emitted item plus the cursor that resumes after it.
#[derive(Debug, Clone)]
pub struct SourcedItem {
    pub item: ChainItem,
    pub cursor: SourceCursor,
}

/// Lazy sequence of items produced by a source.
#[async_trait]
pub trait ItemStream: Send {
    /// The next item, or `None` once the sequence is exhausted.
    async fn next_item(&mut self) -> Result<Option<SourcedItem>>;
}

/// A restartable producer of items.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Start (or resume) emission. `None` starts from the beginning.
    async fn produce(&self, cursor: Option<SourceCursor>) -> Result<Box<dyn ItemStream>>;
}
