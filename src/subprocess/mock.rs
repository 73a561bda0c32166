use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

type ArgsPredicate = Box<dyn Fn(&[String]) -> bool + Send + Sync>;

/// Scripted stand-in for the real process runner.
///
/// Expectations are matched in registration order by program name plus an
/// optional argument predicate. A command no expectation covers is an error,
/// so a test exercising an unscripted side effect fails loudly instead of
/// passing by accident.
#[derive(Clone, Default)]
pub struct MockProcessRunner {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    expectations: Vec<Expectation>,
    history: Vec<ProcessCommand>,
}

struct Expectation {
    program: String,
    matcher: Option<ArgsPredicate>,
    output: ProcessOutput,
    /// Invocations left before this expectation stops answering;
    /// `None` answers forever.
    remaining: Option<usize>,
}

impl Expectation {
    fn matches(&self, command: &ProcessCommand) -> bool {
        self.program == command.program
            && self.matcher.as_ref().map_or(true, |m| m(&command.args))
    }
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start scripting a response for `program`. The expectation only takes
    /// effect once [`finish`](ExpectationBuilder::finish) is called.
    pub fn expect_command(&mut self, program: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            state: Arc::clone(&self.state),
            expectation: Expectation {
                program: program.to_string(),
                matcher: None,
                output: ProcessOutput {
                    status: ExitStatus::Success,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: Duration::from_millis(1),
                },
                remaining: None,
            },
        }
    }

    /// Whether `program` was run exactly `times` times.
    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        let state = self.state.lock().unwrap();
        state
            .history
            .iter()
            .filter(|command| command.program == program)
            .count()
            == times
    }

    pub fn get_call_history(&self) -> Vec<ProcessCommand> {
        self.state.lock().unwrap().history.clone()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let mut state = self.state.lock().unwrap();
        state.history.push(command.clone());

        let Some(expectation) = state
            .expectations
            .iter_mut()
            .find(|expectation| expectation.matches(&command))
        else {
            return Err(ProcessError::UnexpectedCommand(format!(
                "{} {:?}",
                command.program, command.args
            )));
        };

        match &mut expectation.remaining {
            Some(0) => Err(ProcessError::UnexpectedCommand(format!(
                "{} invoked more often than scripted",
                command.program
            ))),
            Some(left) => {
                *left -= 1;
                Ok(expectation.output.clone())
            }
            None => Ok(expectation.output.clone()),
        }
    }
}

/// Builds one scripted response; created by
/// [`MockProcessRunner::expect_command`].
pub struct ExpectationBuilder {
    state: Arc<Mutex<MockState>>,
    expectation: Expectation,
}

impl ExpectationBuilder {
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.matcher = Some(Box::new(matcher));
        self
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        self.expectation.output.stdout = stdout.to_string();
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        self.expectation.output.stderr = stderr.to_string();
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.expectation.output.status = if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Error(code)
        };
        self
    }

    pub fn returns_success(mut self) -> Self {
        self.expectation.output.status = ExitStatus::Success;
        self
    }

    /// Answer at most `n` invocations; further matching calls error.
    pub fn times(mut self, n: usize) -> Self {
        self.expectation.remaining = Some(n);
        self
    }

    pub fn finish(self) {
        self.state.lock().unwrap().expectations.push(self.expectation);
    }
}
