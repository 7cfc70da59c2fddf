// ABOUTME: Run command implementation.
// ABOUTME: Executes the plan on every host and prints one report per host.

use sshbatch::batch::{BatchOutcome, BatchRunner, ReportLimits, run_on_hosts, summarize};
use sshbatch::config::Plan;
use sshbatch::error::Result;
use sshbatch::output::Output;
use sshbatch::ssh::{Host, RusshConnector};
use std::sync::Arc;

/// Run the plan. Returns true when every step on every host passed.
pub async fn run_plan(plan: Plan, output: &Output, stream: bool) -> Result<bool> {
    let hosts = plan.resolve_hosts()?;
    let steps = plan.step_specs();

    output.progress(&format!(
        "Running {} step(s) on {} host(s)",
        steps.len(),
        hosts.len()
    ));
    for host in &hosts {
        output.progress(&format!("  → Connecting to {}...", host));
    }

    let outcomes = run_on_hosts(&RusshConnector::default(), hosts, steps, |host| {
        runner_for(host, output, stream)
    })
    .await;

    Ok(report_outcomes(&outcomes, &plan.report, output))
}

fn runner_for(host: &Host, output: &Output, stream: bool) -> BatchRunner {
    if !stream {
        return BatchRunner::new();
    }
    let output = output.clone();
    let label = host.to_string();
    BatchRunner::new().with_progress(Arc::new(move |step: &str, chunk: &[u8]| {
        output.stream(&label, step, chunk)
    }))
}

/// Print one report per host. Returns true when everything passed.
fn report_outcomes(outcomes: &[BatchOutcome], limits: &ReportLimits, output: &Output) -> bool {
    let mut all_passed = true;
    for outcome in outcomes {
        let report = summarize(outcome, limits);
        output.report(&report);
        all_passed &= report.all_passed();
    }

    if all_passed {
        output.success("All steps passed");
    } else {
        output.error("Some steps did not pass");
    }
    all_passed
}
