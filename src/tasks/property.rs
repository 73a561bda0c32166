//! Predicate check over the item's current state

use crate::chain::{ChainItem, Task, TaskOutcome};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

pub type PredicateFn = Box<dyn Fn(&ChainItem) -> bool + Send + Sync>;

/// Evaluates an arbitrary predicate of the item. Records a `{valid}` property
/// only when given a name; the predicate result is the continuation decision
/// either way.
pub struct CheckPropertyTask {
    name: Option<String>,
    predicate: PredicateFn,
}

impl CheckPropertyTask {
    pub fn new(predicate: PredicateFn, name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            predicate,
        }
    }
}

#[async_trait]
impl Task for CheckPropertyTask {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("property")
    }

    async fn apply(&self, mut item: ChainItem, _checkpoint: Option<Value>) -> Result<TaskOutcome> {
        let valid = (self.predicate)(&item);
        if let Some(name) = &self.name {
            item.set_property(name, json!({ "valid": valid }));
        }
        Ok(TaskOutcome::gated(item, valid))
    }
}
