// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use crate::batch::Report;
use parking_lot::Mutex;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

/// Width live output lines are cut to.
pub const STREAM_WIDTH: usize = 120;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
#[derive(Debug, Clone)]
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
    // Held while a chunk is written so concurrent hosts don't split each other's lines.
    console: Arc<Mutex<()>>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
            console: Arc::new(Mutex::new(())),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print live command output, one trimmed line at a time (normal mode only).
    pub fn stream(&self, host: &str, label: &str, chunk: &[u8]) {
        if self.mode != OutputMode::Normal {
            return;
        }
        let _console = self.console.lock();
        let mut stdout = std::io::stdout().lock();
        for line in render_stream_lines(chunk) {
            let _ = writeln!(stdout, "  [{host}] {label} | {line}");
        }
    }

    /// Print a batch report.
    pub fn report(&self, report: &Report) {
        match self.mode {
            OutputMode::Normal => {
                let _console = self.console.lock();
                println!("{report}\n");
            }
            OutputMode::Quiet => {
                println!(
                    "{}: PASS {} FAIL {} ERROR {}{}",
                    report.host,
                    report.counts.pass,
                    report.counts.fail,
                    report.counts.error,
                    if report.incomplete.is_some() {
                        " (incomplete)"
                    } else {
                        ""
                    }
                );
            }
            OutputMode::Json => {
                let event = ReportEvent {
                    event: "report",
                    report,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => self.json_event("success", message, false),
        }
    }

    /// Print a warning message.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.json_event("warning", message, true),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => self.json_event("error", message, true),
        }
    }

    fn json_event(&self, event: &str, message: &str, to_stderr: bool) {
        let event = JsonEvent {
            event,
            message,
            duration_secs: self.duration(),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            if to_stderr {
                eprintln!("{json}");
            } else {
                println!("{json}");
            }
        }
    }
}

/// Split a received chunk into non-blank lines cut to [`STREAM_WIDTH`].
pub fn render_stream_lines(chunk: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(chunk)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| crate::batch::clip_line(line, STREAM_WIDTH))
        .collect()
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct ReportEvent<'a> {
    event: &'a str,
    report: &'a Report,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_lines_skip_blanks_and_clip() {
        let long = "y".repeat(300);
        let chunk = format!("  step 1/4 : FROM node\n\n{long}\r\n");
        let lines = render_stream_lines(chunk.as_bytes());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "step 1/4 : FROM node");
        assert_eq!(lines[1].chars().count(), STREAM_WIDTH);
    }

    #[test]
    fn timer_reports_elapsed() {
        let mut output = Output::new(OutputMode::Quiet);
        assert_eq!(output.elapsed_secs(), 0.0);
        output.start_timer();
        assert!(output.duration().is_some());
    }
}
