// ABOUTME: Command module aggregator for the sshbatch CLI.
// ABOUTME: Re-exports run, exec, and check command handlers.

mod check;
mod exec;
mod run;

pub use check::check_plan;
pub use exec::exec_command;
pub use run::run_plan;

use sshbatch::config::Plan;
use sshbatch::error::Result;
use std::path::Path;

/// Load the plan from `--file` or discover it in the current directory,
/// then apply the destination overrides if one was named.
pub fn load_plan(file: Option<&Path>, destination: Option<&str>) -> Result<Plan> {
    let plan = match file {
        Some(path) => Plan::load(path)?,
        None => Plan::discover(&std::env::current_dir()?)?,
    };

    match destination {
        Some(dest) => plan.for_destination(dest),
        None => Ok(plan),
    }
}
