// ABOUTME: Batch execution of labeled commands over one session.
// ABOUTME: Runs steps in order, classifies each, and summarizes the outcome.

mod fleet;
mod report;
mod runner;
mod step;

pub use fleet::run_on_hosts;
pub use report::{Counts, Report, ReportLimits, StepReport, clip_line, summarize};
pub use runner::{BatchOutcome, BatchRunner, ProgressFn};
pub use step::{BatchStep, Classification, StepSpec, classify};
