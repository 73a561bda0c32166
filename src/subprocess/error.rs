use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("exited with code {0}")]
    ExitCode(i32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("output was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Produced only by the mock runner when a test runs a command it did
    /// not script.
    #[error("unexpected command: {0}")]
    UnexpectedCommand(String),
}
