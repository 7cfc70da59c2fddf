// ABOUTME: Entry point for the sshbatch CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use sshbatch::config;
use sshbatch::error::Result;
use sshbatch::output::Output;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Every step passed.
const EXIT_PASS: u8 = 0;
/// A step failed or errored, or a host in a plan run never finished its batch.
const EXIT_STEP_FAILED: u8 = 1;
/// The plan or arguments were invalid, or `exec` could not open its session.
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag; RUST_LOG wins when set
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut output = Output::new(cli.output);
    output.start_timer();

    match run(cli, &output).await {
        Ok(true) => ExitCode::from(EXIT_PASS),
        Ok(false) => ExitCode::from(EXIT_STEP_FAILED),
        Err(e) => {
            output.error(&e.to_string());
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Dispatch the subcommand. `Ok(false)` means the work ran but not every step passed.
async fn run(cli: Cli, output: &Output) -> Result<bool> {
    match cli.command {
        Commands::Init { host, force } => {
            let cwd = std::env::current_dir()?;
            config::init_plan(&cwd, host.as_deref(), force)?;
            output.success(&format!("Created {}", config::PLAN_FILENAME));
            Ok(true)
        }
        Commands::Run {
            destination,
            stream,
        } => {
            let plan = commands::load_plan(cli.file.as_deref(), destination.as_deref())?;
            commands::run_plan(plan, output, stream).await
        }
        Commands::Check { destination } => {
            let plan = commands::load_plan(cli.file.as_deref(), destination.as_deref())?;
            commands::check_plan(&plan, output)?;
            Ok(true)
        }
        Commands::Exec(args) => commands::exec_command(args, output).await,
    }
}
