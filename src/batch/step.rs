// ABOUTME: Batch step types and the PASS/FAIL/ERROR classification rule.
// ABOUTME: Every attempted step ends with exactly one classification.

use crate::ssh::{CommandRequest, CommandResult, Completion};
use serde::Serialize;
use std::fmt;

/// Verdict for one executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Pass,
    Fail,
    Error,
}

impl Classification {
    pub const ALL: [Classification; 3] = [
        Classification::Pass,
        Classification::Fail,
        Classification::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Pass => "PASS",
            Classification::Fail => "FAIL",
            Classification::Error => "ERROR",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labeled command waiting to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    pub label: String,
    pub request: CommandRequest,
}

impl StepSpec {
    pub fn new(label: impl Into<String>, request: CommandRequest) -> Self {
        Self {
            label: label.into(),
            request,
        }
    }
}

/// A step after execution.
#[derive(Debug, Clone)]
pub struct BatchStep {
    pub label: String,
    pub request: CommandRequest,
    /// None only when the command never reached the remote side.
    pub result: Option<CommandResult>,
    pub classification: Classification,
    /// Why the step did not pass.
    pub note: Option<String>,
}

impl BatchStep {
    /// Classify a completed command.
    pub fn completed(spec: StepSpec, result: CommandResult) -> Self {
        let (classification, note) = classify(&spec.request, &result);
        Self {
            label: spec.label,
            request: spec.request,
            result: Some(result),
            classification,
            note,
        }
    }

    /// Record a step whose channel could not be set up.
    pub fn errored(spec: StepSpec, reason: impl Into<String>) -> Self {
        Self {
            label: spec.label,
            request: spec.request,
            result: None,
            classification: Classification::Error,
            note: Some(reason.into()),
        }
    }

    pub fn passed(&self) -> bool {
        self.classification == Classification::Pass
    }

    /// Collected output, empty when the command never ran.
    pub fn output(&self) -> &[u8] {
        self.result.as_ref().map(|r| r.output.as_slice()).unwrap_or_default()
    }
}

/// Apply the classification rule to a command result.
///
/// A non-zero exit is FAIL regardless of output. A read error is ERROR.
/// Running out of time without an exit status counts as FAIL since the
/// command itself did not finish.
pub fn classify(request: &CommandRequest, result: &CommandResult) -> (Classification, Option<String>) {
    match &result.completion {
        Completion::ReadTruncated(reason) => (
            Classification::Error,
            Some(format!("read error, output may be truncated: {reason}")),
        ),
        Completion::Signaled(signal) => (
            Classification::Fail,
            Some(format!("terminated by signal {signal}")),
        ),
        Completion::ReadTimeout => (
            Classification::Fail,
            Some(format!(
                "no output for {:?}, exit status unknown",
                request.read_timeout
            )),
        ),
        Completion::DeadlineExceeded => (
            Classification::Fail,
            Some(format!(
                "deadline of {:?} exceeded, exit status unknown",
                request.deadline.unwrap_or_default()
            )),
        ),
        Completion::Exited => match result.exit_code {
            Some(0) if request.expect_output && result.output.iter().all(u8::is_ascii_whitespace) => {
                (Classification::Fail, Some("expected output but got none".to_string()))
            }
            Some(0) => (Classification::Pass, None),
            Some(code) => (Classification::Fail, Some(format!("exited with code {code}"))),
            None => (
                Classification::Error,
                Some("no exit status reported".to_string()),
            ),
        },
    }
}
