// ABOUTME: Batch summary report with per-classification counts and bounded output previews.
// ABOUTME: Only the rendered preview is truncated; full output stays on each BatchStep.

use super::runner::BatchOutcome;
use super::step::{BatchStep, Classification};
use crate::ssh::Completion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bounds applied when rendering step output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLimits {
    /// Leading lines shown for passing steps.
    #[serde(default = "default_preview_lines")]
    pub preview_lines: usize,
    /// Trailing lines shown for failed or errored steps.
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
    /// Maximum characters per rendered line.
    #[serde(default = "default_preview_width")]
    pub preview_width: usize,
}

fn default_preview_lines() -> usize {
    10
}

fn default_tail_lines() -> usize {
    30
}

fn default_preview_width() -> usize {
    120
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            preview_lines: default_preview_lines(),
            tail_lines: default_tail_lines(),
            preview_width: default_preview_width(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub pass: usize,
    pub fail: usize,
    pub error: usize,
}

impl Counts {
    pub fn get(&self, classification: Classification) -> usize {
        match classification {
            Classification::Pass => self.pass,
            Classification::Fail => self.fail,
            Classification::Error => self.error,
        }
    }

    fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Pass => self.pass += 1,
            Classification::Fail => self.fail += 1,
            Classification::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.error
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub label: String,
    pub command: String,
    pub classification: Classification,
    pub exit_code: Option<u32>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<Completion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub preview: Vec<String>,
    /// Output lines left out of the preview.
    pub omitted_lines: usize,
}

/// Rendered summary of one batch.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub host: String,
    pub generated_at: DateTime<Utc>,
    pub planned: usize,
    pub counts: Counts,
    pub steps: Vec<StepReport>,
    /// Set when a fatal error stopped the batch early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete: Option<String>,
}

impl Report {
    pub fn all_passed(&self) -> bool {
        self.incomplete.is_none() && self.counts.pass == self.planned
    }
}

/// Summarize a batch outcome for display.
pub fn summarize(outcome: &BatchOutcome, limits: &ReportLimits) -> Report {
    let mut counts = Counts::default();
    let steps = outcome
        .steps
        .iter()
        .map(|step| {
            counts.record(step.classification);
            step_report(step, limits)
        })
        .collect();

    let incomplete = outcome.aborted.as_ref().map(|e| {
        format!(
            "{} after {} of {} steps",
            e,
            outcome.steps.len(),
            outcome.planned
        )
    });

    Report {
        host: outcome.host.clone(),
        generated_at: Utc::now(),
        planned: outcome.planned,
        counts,
        steps,
        incomplete,
    }
}

fn step_report(step: &BatchStep, limits: &ReportLimits) -> StepReport {
    let text = String::from_utf8_lossy(step.output());
    let (preview, omitted_lines) = match step.classification {
        Classification::Pass => preview(&text, limits.preview_lines, limits.preview_width, false),
        Classification::Fail | Classification::Error => {
            preview(&text, limits.tail_lines, limits.preview_width, true)
        }
    };

    let result = step.result.as_ref();
    StepReport {
        label: step.label.clone(),
        command: step.request.command.clone(),
        classification: step.classification,
        exit_code: result.and_then(|r| r.exit_code),
        elapsed_ms: result
            .map(|r| u64::try_from(r.elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0),
        completion: result
            .map(|r| r.completion.clone())
            .filter(|c| *c != Completion::Exited),
        note: step.note.clone(),
        preview,
        omitted_lines,
    }
}

/// Keep up to `max_lines` non-blank lines from the head (or tail) of `text`,
/// each cut to `width` characters.
fn preview(text: &str, max_lines: usize, width: usize, tail: bool) -> (Vec<String>, usize) {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();
    let omitted = lines.len().saturating_sub(max_lines);
    let kept = if tail {
        &lines[omitted..]
    } else {
        &lines[..lines.len() - omitted]
    };
    let rendered = kept.iter().map(|line| clip_line(line, width)).collect();
    (rendered, omitted)
}

pub fn clip_line(line: &str, width: usize) -> String {
    match line.char_indices().nth(width) {
        Some((cut, _)) if width > 3 => {
            let keep = line[..cut].char_indices().nth(width - 3).map(|(i, _)| i).unwrap_or(cut);
            format!("{}...", &line[..keep])
        }
        Some((cut, _)) => line[..cut].to_string(),
        None => line.to_string(),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.host)?;
        for step in &self.steps {
            write!(
                f,
                "[{:<5}] {} ({:.1}s)",
                step.classification.as_str(),
                step.label,
                step.elapsed_ms as f64 / 1000.0
            )?;
            if let Some(note) = &step.note {
                write!(f, " - {note}")?;
            }
            writeln!(f)?;

            if step.omitted_lines > 0 && step.classification != Classification::Pass {
                writeln!(f, "      ... {} earlier lines", step.omitted_lines)?;
            }
            for line in &step.preview {
                writeln!(f, "      {line}")?;
            }
            if step.omitted_lines > 0 && step.classification == Classification::Pass {
                writeln!(f, "      ... {} more lines", step.omitted_lines)?;
            }
        }

        write!(
            f,
            "PASS: {}  FAIL: {}  ERROR: {}  ({} of {} steps run)",
            self.counts.pass,
            self.counts.fail,
            self.counts.error,
            self.counts.total(),
            self.planned
        )?;
        if let Some(reason) = &self.incomplete {
            write!(f, "\nINCOMPLETE: {reason}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::StepSpec;
    use crate::ssh::{CommandRequest, CommandResult, Error};
    use std::time::Duration;

    fn step(label: &str, code: u32, output: &str) -> BatchStep {
        BatchStep::completed(
            StepSpec::new(label, CommandRequest::new(label)),
            CommandResult {
                output: output.as_bytes().to_vec(),
                exit_code: Some(code),
                elapsed: Duration::from_millis(1500),
                completion: Completion::Exited,
            },
        )
    }

    fn outcome(steps: Vec<BatchStep>, planned: usize, aborted: Option<Error>) -> BatchOutcome {
        BatchOutcome {
            host: "root@10.0.0.1:22".to_string(),
            steps,
            planned,
            aborted,
        }
    }

    #[test]
    fn counts_per_classification() {
        let report = summarize(
            &outcome(vec![step("health", 0, "ok"), step("restart", 1, "")], 2, None),
            &ReportLimits::default(),
        );
        assert_eq!(report.counts, Counts { pass: 1, fail: 1, error: 0 });
        assert!(report.incomplete.is_none());
        assert!(!report.all_passed());
    }

    #[test]
    fn passing_preview_keeps_head() {
        let output: String = (1..=20).map(|i| format!("line {i}\n")).collect();
        let limits = ReportLimits {
            preview_lines: 3,
            ..Default::default()
        };
        let report = summarize(&outcome(vec![step("logs", 0, &output)], 1, None), &limits);
        let step = &report.steps[0];
        assert_eq!(step.preview, vec!["line 1", "line 2", "line 3"]);
        assert_eq!(step.omitted_lines, 17);
    }

    #[test]
    fn failing_preview_keeps_tail() {
        let output: String = (1..=50).map(|i| format!("build {i}\n")).collect();
        let limits = ReportLimits {
            tail_lines: 2,
            ..Default::default()
        };
        let report = summarize(&outcome(vec![step("build", 2, &output)], 1, None), &limits);
        assert_eq!(report.steps[0].preview, vec!["build 49", "build 50"]);
        assert_eq!(report.steps[0].omitted_lines, 48);
    }

    #[test]
    fn full_output_is_retained_on_step() {
        let long = "x".repeat(500);
        let batch = outcome(vec![step("wide", 0, &long)], 1, None);
        let report = summarize(&batch, &ReportLimits::default());
        assert_eq!(report.steps[0].preview[0].chars().count(), 120);
        assert_eq!(batch.steps[0].output().len(), 500);
    }

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip_line("short", 10), "short");
        assert_eq!(clip_line("ééééééééé", 6), "ééé...");
        assert_eq!(clip_line("abcdef", 2), "ab");
    }

    #[test]
    fn aborted_batch_is_marked_incomplete() {
        let report = summarize(
            &outcome(vec![step("health", 0, "ok")], 3, Some(Error::Disconnected)),
            &ReportLimits::default(),
        );
        let reason = report.incomplete.as_deref().unwrap();
        assert!(reason.contains("after 1 of 3 steps"));
        assert!(report.to_string().contains("INCOMPLETE"));
        assert!(!report.all_passed());
    }

    #[test]
    fn rendered_report_lists_every_step() {
        let report = summarize(
            &outcome(vec![step("health", 0, "ok"), step("restart", 1, "")], 2, None),
            &ReportLimits::default(),
        );
        let text = report.to_string();
        assert!(text.contains("[PASS ] health (1.5s)"));
        assert!(text.contains("[FAIL ] restart (1.5s) - exited with code 1"));
        assert!(text.contains("PASS: 1  FAIL: 1  ERROR: 0  (2 of 2 steps run)"));
    }
}
