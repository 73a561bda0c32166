//! Replay of previously-serialized query results from disk

use super::{ItemSource, ItemStream, SourceCursor, SourcedItem};
use crate::chain::ChainItem;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// Emits items from a JSON file holding either a key→item map (the shape the
/// results writer produces) or a plain array of items.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ItemSource for FileSource {
    async fn produce(&self, cursor: Option<SourceCursor>) -> Result<Box<dyn ItemStream>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read item file {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse item file {}", self.path.display()))?;

        let items = match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(_, item)| serde_json::from_value(item))
                .collect::<Result<Vec<ChainItem>, _>>(),
            Value::Array(entries) => entries
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<ChainItem>, _>>(),
            _ => bail!(
                "item file {} must contain a JSON object or array",
                self.path.display()
            ),
        }
        .with_context(|| format!("malformed item in {}", self.path.display()))?;

        let index = cursor.unwrap_or_default().index;
        debug!(
            "Replaying {} items from {} starting at {index}",
            items.len(),
            self.path.display()
        );
        Ok(Box::new(FileStream { items, index }))
    }
}

struct FileStream {
    items: Vec<ChainItem>,
    index: usize,
}

#[async_trait]
impl ItemStream for FileStream {
    async fn next_item(&mut self) -> Result<Option<SourcedItem>> {
        let Some(item) = self.items.get(self.index) else {
            return Ok(None);
        };
        self.index += 1;
        Ok(Some(SourcedItem {
            item: item.clone(),
            cursor: SourceCursor { index: self.index },
        }))
    }
}
