//! Chain configuration loaded from YAML
//!
//! A chain file names the chain, describes its item source, and lists the
//! checks to run. Problems surface at load or validation time, before any
//! item is processed.

use crate::github::{CommitQuery, FileQuery, RepoQuery};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain name; also names the checkpoint and results files.
    pub name: String,
    pub source: SourceConfig,
    /// Directory for checkpoint state.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Directory the results file is written to.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    pub steps: Vec<StepConfig>,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".reposift")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Where items come from. An unrecognized tag fails deserialization, which
/// is fatal at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Live repository search
    Query {
        #[serde(flatten)]
        query: RepoQuery,
    },
    /// Replay of previously-serialized results
    File { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    CheckFile {
        name: String,
        #[serde(flatten)]
        query: FileQuery,
        #[serde(default)]
        optional: bool,
    },
    CheckCommit {
        name: String,
        #[serde(flatten)]
        query: CommitQuery,
        #[serde(default)]
        optional: bool,
    },
    Clone {
        dest: PathBuf,
    },
    CheckCommand {
        name: String,
        command: String,
        #[serde(default)]
        optional: bool,
    },
    CheckCommandOnFiles {
        name: String,
        files_property: String,
        command: String,
        #[serde(default)]
        optional: bool,
    },
    CheckLoc {
        name: String,
        extension: String,
        #[serde(default)]
        parents: Vec<String>,
        #[serde(default)]
        exclude: Vec<String>,
        #[serde(default = "default_threshold")]
        threshold: i64,
        #[serde(default)]
        optional: bool,
    },
}

fn default_threshold() -> i64 {
    -1
}

/// Persisted records fold step properties into the same object as the
/// repository fields, so these names are off limits for steps.
const RESERVED_STEP_NAMES: [&str; 8] = [
    "id",
    "name",
    "full_name",
    "html_url",
    "clone_url",
    "default_branch",
    "stargazers_count",
    "language",
];

impl StepConfig {
    /// The property name this step registers under. The clone step always
    /// registers as `clone`.
    pub fn step_name(&self) -> &str {
        match self {
            StepConfig::CheckFile { name, .. }
            | StepConfig::CheckCommit { name, .. }
            | StepConfig::CheckCommand { name, .. }
            | StepConfig::CheckCommandOnFiles { name, .. }
            | StepConfig::CheckLoc { name, .. } => name,
            StepConfig::Clone { .. } => crate::chain::CLONE_PROPERTY,
        }
    }

    fn needs_clone(&self) -> bool {
        matches!(
            self,
            StepConfig::CheckCommandOnFiles { .. } | StepConfig::CheckLoc { .. }
        )
    }
}

impl ChainConfig {
    pub fn checkpoint_path(&self) -> PathBuf {
        self.state_dir.join(format!("{}.checkpoint.json", self.name))
    }

    pub fn results_path(&self) -> PathBuf {
        self.results_dir.join(format!("results_{}.json", self.name))
    }

    /// Reject definitions the chain cannot execute: duplicate step names,
    /// filesystem checks without a prior clone, and file-set commands
    /// referencing a property no earlier file check records.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            bail!("chain name must not be empty");
        }
        if self.steps.is_empty() {
            bail!("chain {} has no steps", self.name);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut file_checks: HashSet<&str> = HashSet::new();
        let mut cloned = false;
        for step in &self.steps {
            let name = step.step_name();
            if !seen.insert(name) {
                bail!("duplicate step name '{name}' in chain {}", self.name);
            }
            if RESERVED_STEP_NAMES.contains(&name) {
                bail!(
                    "step name '{name}' in chain {} collides with a repository field",
                    self.name
                );
            }
            if step.needs_clone() && !cloned {
                bail!(
                    "step '{name}' in chain {} needs a repository on disk; add a clone step before it",
                    self.name
                );
            }
            match step {
                StepConfig::CheckFile { name, .. } => {
                    file_checks.insert(name.as_str());
                }
                StepConfig::Clone { .. } => cloned = true,
                StepConfig::CheckCommandOnFiles { files_property, .. } => {
                    if !file_checks.contains(files_property.as_str()) {
                        bail!(
                            "step '{name}' in chain {} references '{files_property}', which no earlier check_file step records",
                            self.name
                        );
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Load and parse a chain file.
pub fn load_chain_config(path: &Path) -> Result<ChainConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read chain config {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse chain config {}", path.display()))
}
