//! Command checks: run shell commands derived from an item and judge the
//! captured result

use crate::chain::{ChainItem, Task, TaskOutcome};
use crate::github::CodeMatch;
use crate::subprocess::{ExitStatus, ProcessCommandBuilder, SubprocessManager};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Captured result of one shell command. Execution problems surface here as
/// data, never as task failures.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    /// Why execution did not succeed: spawn failure, non-zero exit, signal,
    /// or timeout. `None` means the command ran and exited zero.
    pub error: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

pub type CommandFn = Box<dyn Fn(&ChainItem) -> String + Send + Sync>;
pub type ConditionFn = Box<dyn Fn(&CommandResult) -> bool + Send + Sync>;

/// The default validity condition: the command executed without error.
pub fn default_condition() -> ConditionFn {
    Box::new(|result| result.error.is_none())
}

/// Run `command` through `sh -c`, capturing the outcome as data.
async fn run_shell(
    subprocess: &SubprocessManager,
    command: &str,
    cwd: Option<&Path>,
) -> CommandResult {
    let mut builder = ProcessCommandBuilder::shell(command);
    if let Some(dir) = cwd {
        builder = builder.current_dir(dir);
    }
    match subprocess.run(builder.build()).await {
        Ok(output) => {
            let error = match output.status {
                ExitStatus::Success => None,
                ExitStatus::Error(code) => Some(format!("exit code {code}")),
                ExitStatus::Timeout => Some("timed out".to_string()),
                ExitStatus::Signal(signal) => Some(format!("terminated by signal {signal}")),
            };
            CommandResult {
                error,
                stdout: output.stdout,
                stderr: output.stderr,
            }
        }
        Err(err) => CommandResult {
            error: Some(err.to_string()),
            stdout: String::new(),
            stderr: String::new(),
        },
    }
}

/// Runs one command derived from the item. The command executes in the
/// repository's clone directory when one is recorded.
pub struct CheckCommandTask {
    name: String,
    command: CommandFn,
    condition: ConditionFn,
    optional: bool,
    subprocess: SubprocessManager,
}

impl CheckCommandTask {
    pub fn new(
        name: &str,
        command: CommandFn,
        condition: ConditionFn,
        optional: bool,
        subprocess: SubprocessManager,
    ) -> Self {
        Self {
            name: name.to_string(),
            command,
            condition,
            optional,
            subprocess,
        }
    }
}

#[async_trait]
impl Task for CheckCommandTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, mut item: ChainItem, _checkpoint: Option<Value>) -> Result<TaskOutcome> {
        let command = (self.command)(&item);
        info!("Executing: {command}");
        let cwd = item.clone_path();
        let result = run_shell(&self.subprocess, &command, cwd.as_deref()).await;
        let valid = (self.condition)(&result);
        item.set_property(&self.name, json!({ "valid": valid }));
        Ok(TaskOutcome::gated(item, valid || self.optional))
    }
}

/// Runs a command in the parent folder of each file recorded by an earlier
/// existence check, once per distinct folder. Valid when at least one folder
/// satisfies the condition; the passing folders are recorded.
pub struct CheckCommandOnFilesTask {
    name: String,
    files_property: String,
    command: String,
    condition: ConditionFn,
    optional: bool,
    subprocess: SubprocessManager,
}

impl CheckCommandOnFilesTask {
    pub fn new(
        name: &str,
        files_property: &str,
        command: &str,
        condition: ConditionFn,
        optional: bool,
        subprocess: SubprocessManager,
    ) -> Self {
        Self {
            name: name.to_string(),
            files_property: files_property.to_string(),
            command: command.to_string(),
            condition,
            optional,
            subprocess,
        }
    }

    fn recorded_files(&self, item: &ChainItem) -> Result<Vec<CodeMatch>> {
        let files = item
            .property(&self.files_property)
            .and_then(|v| v.get("files"))
            .ok_or_else(|| {
                anyhow!(
                    "task {} requires the '{}' property recorded by an earlier file check",
                    self.name,
                    self.files_property
                )
            })?;
        Ok(serde_json::from_value(files.clone())?)
    }
}

#[async_trait]
impl Task for CheckCommandOnFilesTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, mut item: ChainItem, _checkpoint: Option<Value>) -> Result<TaskOutcome> {
        let files = self.recorded_files(&item)?;
        // A failed clone leaves no path; that is a failed check, not a crash.
        let Some(root) = item.clone_path() else {
            item.set_property(
                &self.name,
                json!({ "valid": false, "valid_folders": [] }),
            );
            return Ok(TaskOutcome::gated(item, self.optional));
        };

        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut valid_folders: Vec<String> = Vec::new();
        for file in &files {
            let folder = match Path::new(&file.path).parent() {
                Some(parent) if !parent.as_os_str().is_empty() => root.join(parent),
                _ => root.clone(),
            };
            if !visited.insert(folder.clone()) {
                continue;
            }
            info!("Executing {} in {}", self.command, folder.display());
            let result = run_shell(&self.subprocess, &self.command, Some(&folder)).await;
            if (self.condition)(&result) {
                valid_folders.push(folder.to_string_lossy().into_owned());
            }
        }

        let valid = !valid_folders.is_empty();
        item.set_property(
            &self.name,
            json!({ "valid": valid, "valid_folders": valid_folders }),
        );
        Ok(TaskOutcome::gated(item, valid || self.optional))
    }
}
