// ABOUTME: Check command implementation.
// ABOUTME: Validates the plan and its credentials and lists the steps without connecting.

use sshbatch::config::Plan;
use sshbatch::error::Result;
use sshbatch::output::Output;

pub fn check_plan(plan: &Plan, output: &Output) -> Result<()> {
    // Fails on missing secrets or invalid hosts before anything is printed.
    let hosts = plan.resolve_hosts()?;

    output.progress(&format!("Hosts ({}):", hosts.len()));
    for host in &hosts {
        output.progress(&format!(
            "  {} (auth: {}, connect timeout {:?})",
            host,
            host.credential.kind(),
            host.connect_timeout
        ));
    }

    let steps = plan.step_specs();
    output.progress(&format!("Steps ({}):", steps.len()));
    for (i, step) in steps.iter().enumerate() {
        let mut limits = format!("read timeout {:?}", step.request.read_timeout);
        if let Some(deadline) = step.request.deadline {
            limits.push_str(&format!(", deadline {:?}", deadline));
        }
        if step.request.expect_output {
            limits.push_str(", expects output");
        }
        output.progress(&format!("  {}. {} ({})", i + 1, step.label, limits));
        if step.label != step.request.command {
            output.progress(&format!("       $ {}", step.request.command));
        }
    }

    output.success("Plan is valid");
    Ok(())
}
