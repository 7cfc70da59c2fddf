// ABOUTME: Step entries and per-plan step defaults.
// ABOUTME: Steps are either a bare command string or a labeled table with time limits.

use super::deserialize::{deserialize_timeout, deserialize_timeout_option};
use crate::batch::StepSpec;
use crate::ssh::{CommandRequest, DEFAULT_READ_TIMEOUT};
use serde::Deserialize;
use std::time::Duration;

/// Values applied to steps that don't set their own.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StepDefaults {
    #[serde(default = "default_read_timeout", deserialize_with = "deserialize_timeout")]
    pub read_timeout: Duration,
    #[serde(default, deserialize_with = "deserialize_timeout_option")]
    pub deadline: Option<Duration>,
    #[serde(default)]
    pub expect_output: bool,
}

fn default_read_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            read_timeout: default_read_timeout(),
            deadline: None,
            expect_output: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub label: Option<String>,
    pub run: String,
    #[serde(default, deserialize_with = "deserialize_timeout_option")]
    pub read_timeout: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_timeout_option")]
    pub deadline: Option<Duration>,
    #[serde(default)]
    pub expect_output: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepEntry {
    Simple(String),
    Detailed(StepConfig),
}

impl StepEntry {
    pub fn command(&self) -> &str {
        match self {
            StepEntry::Simple(command) => command,
            StepEntry::Detailed(step) => &step.run,
        }
    }

    /// The step's label; bare commands are labeled with the command itself.
    pub fn label(&self) -> &str {
        match self {
            StepEntry::Detailed(StepConfig {
                label: Some(label), ..
            }) => label,
            other => other.command(),
        }
    }

    pub fn to_spec(&self, defaults: &StepDefaults) -> StepSpec {
        let mut request = CommandRequest::new(self.command())
            .read_timeout(defaults.read_timeout)
            .expect_output(defaults.expect_output);
        request.deadline = defaults.deadline;

        if let StepEntry::Detailed(step) = self {
            if let Some(timeout) = step.read_timeout {
                request = request.read_timeout(timeout);
            }
            if let Some(deadline) = step.deadline {
                request = request.deadline(deadline);
            }
            if let Some(expect) = step.expect_output {
                request = request.expect_output(expect);
            }
        }

        StepSpec::new(self.label(), request)
    }
}
