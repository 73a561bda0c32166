//! Persistence of the accepted-results collection

use super::item::ChainItem;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Accumulates accepted items keyed by their stable id, rewriting
/// `results_<chain>.json` after every acceptance so the file on disk is
/// always a loadable superset of everything accepted so far. Items stay in
/// acceptance order.
pub struct ResultsWriter {
    path: PathBuf,
    accepted: IndexMap<String, ChainItem>,
}

impl ResultsWriter {
    pub fn new(chain: &str, dir: &Path) -> Self {
        Self {
            path: dir.join(format!("results_{chain}.json")),
            accepted: IndexMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load results persisted by an interrupted run.
    pub async fn load_existing(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read results file {}", self.path.display()))?;
        self.accepted = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse results file {}", self.path.display()))?;
        debug!(
            "Loaded {} previously accepted items from {}",
            self.accepted.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Drop any prior content and write an empty collection.
    pub async fn reset(&mut self) -> Result<()> {
        self.accepted.clear();
        self.write_all().await
    }

    /// Record an accepted item and persist the collection.
    pub async fn record(&mut self, item: ChainItem) -> Result<()> {
        self.accepted.insert(item.key(), item);
        self.write_all().await
    }

    pub fn items(&self) -> &IndexMap<String, ChainItem> {
        &self.accepted
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    async fn write_all(&self) -> Result<()> {
        let temp_path = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create results directory")?;
        }
        let json = serde_json::to_string_pretty(&self.accepted)
            .context("Failed to serialize results")?;
        fs::write(&temp_path, json)
            .await
            .context("Failed to write results to temp file")?;
        fs::rename(temp_path, &self.path)
            .await
            .context("Failed to move results to final location")?;
        Ok(())
    }
}
