// ABOUTME: Command request and result value types.
// ABOUTME: A request carries the command and its time limits; a result carries collected output.

use serde::Serialize;
use std::borrow::Cow;
use std::time::Duration;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// A command to run on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Sent verbatim to the remote shell.
    pub command: String,
    /// Longest wait for the next chunk of output.
    pub read_timeout: Duration,
    /// Overall limit on the whole command, if any.
    pub deadline: Option<Duration>,
    /// Treat a successful run with no output as a failure.
    pub expect_output: bool,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            deadline: None,
            expect_output: false,
        }
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn expect_output(mut self, expect: bool) -> Self {
        self.expect_output = expect;
        self
    }
}

/// How the read loop for a command ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum Completion {
    /// The remote side finished the stream.
    Exited,
    /// A single read waited longer than the request's read timeout.
    ReadTimeout,
    /// The request's overall deadline passed.
    DeadlineExceeded,
    /// Reading failed; the output may be truncated.
    ReadTruncated(String),
    /// The remote process was killed by a signal instead of exiting.
    Signaled(String),
}

/// Everything collected from one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// stdout and stderr interleaved as delivered.
    pub output: Vec<u8>,
    /// None when the remote never reported an exit status.
    pub exit_code: Option<u32>,
    pub elapsed: Duration,
    pub completion: Completion,
}

impl CommandResult {
    /// Output decoded as UTF-8, replacing invalid sequences.
    pub fn output_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }

    /// Exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn timed_out(&self) -> bool {
        matches!(
            self.completion,
            Completion::ReadTimeout | Completion::DeadlineExceeded
        )
    }

    pub fn truncated(&self) -> bool {
        matches!(self.completion, Completion::ReadTruncated(_))
    }
}
