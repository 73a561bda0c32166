//! Items flowing through a task chain

use crate::github::Repository;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Property name the clone task records its local path under.
pub const CLONE_PROPERTY: &str = "clone";

/// A repository record flowing through a chain. Each task writes its result
/// into the property bag under its own name; entries are cumulative and
/// survive into the persisted record, whether the item is accepted or not.
///
/// Both the repository fields and the property bag fold into the top level of
/// the serialized record, so a persisted item reads as one flat object with
/// one key per task that ran. Task names therefore must not collide with
/// repository field names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainItem {
    #[serde(flatten)]
    pub repo: Repository,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl ChainItem {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            properties: Map::new(),
        }
    }

    /// Stable unique key identifying this item in the results collection.
    pub fn key(&self) -> String {
        self.repo.id.to_string()
    }

    /// Record a task result. Entries written by other tasks are left alone.
    pub fn set_property(&mut self, name: &str, value: Value) {
        self.properties.insert(name.to_string(), value);
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Local path recorded by the clone task, if this repository was
    /// materialized successfully.
    pub fn clone_path(&self) -> Option<PathBuf> {
        self.properties
            .get(CLONE_PROPERTY)
            .and_then(|v| v.get("full_path"))
            .and_then(Value::as_str)
            .map(PathBuf::from)
    }
}
