use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::builder::ProcessCommandBuilder;
use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessRunner};

/// A hung clone must not block the whole chain; shallow clones finish well
/// under this on any sane network.
const CLONE_TIMEOUT: Duration = Duration::from_secs(600);

#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Materialize `url` at `dest` with a depth-1 clone.
    async fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), ProcessError>;
}

pub struct GitRunnerImpl {
    runner: Arc<dyn ProcessRunner>,
}

impl GitRunnerImpl {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }
}

/// Check if a command completed successfully, returning an error for non-zero
/// exit codes.
fn check_command_success(status: &ExitStatus) -> Result<(), ProcessError> {
    if status.success() {
        Ok(())
    } else {
        Err(ProcessError::ExitCode(status.code().unwrap_or(1)))
    }
}

#[async_trait]
impl GitRunner for GitRunnerImpl {
    async fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), ProcessError> {
        let command = ProcessCommandBuilder::new("git")
            .args(["clone", "--depth", "1", url])
            .arg(dest.to_string_lossy())
            .timeout(CLONE_TIMEOUT)
            .build();

        let output = self.runner.run(command).await?;
        check_command_success(&output.status)
    }
}
