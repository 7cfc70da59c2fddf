// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use sshbatch::output::OutputMode;
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    match parse_duration(s)? {
        d if d.is_zero() => Err("must be greater than zero".to_string()),
        d => Ok(d),
    }
}

#[derive(Parser)]
#[command(name = "sshbatch")]
#[command(about = "Run labeled command batches against remote hosts over SSH")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output mode
    #[arg(long, value_enum, default_value_t = OutputMode::Normal, global = true)]
    pub output: OutputMode,

    /// Plan file (default: sshbatch.yml in the current directory)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a template sshbatch.yml
    Init {
        /// Target host as user@host:port
        #[arg(long)]
        host: Option<String>,

        /// Overwrite an existing plan
        #[arg(long)]
        force: bool,
    },

    /// Run the plan's steps on every host
    Run {
        /// Target destination (defined in the plan)
        #[arg(short, long)]
        destination: Option<String>,

        /// Print command output live as it arrives
        #[arg(long)]
        stream: bool,
    },

    /// Validate the plan and list its steps without connecting
    Check {
        /// Target destination (defined in the plan)
        #[arg(short, long)]
        destination: Option<String>,
    },

    /// Run a single command on one host
    Exec(ExecArgs),
}

#[derive(Args)]
pub struct ExecArgs {
    /// Target host as user@host:port
    pub target: String,

    /// Command to run, passed verbatim to the remote shell
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Read the password from this environment variable
    #[arg(long, conflicts_with_all = ["key", "agent"])]
    pub password_env: Option<String>,

    /// Private key file
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Use the SSH agent only
    #[arg(long)]
    pub agent: bool,

    /// Longest wait for the next chunk of output
    #[arg(long, default_value = "30s", value_parser = parse_timeout)]
    pub read_timeout: Duration,

    /// Overall limit on the command
    #[arg(long, value_parser = parse_timeout)]
    pub deadline: Option<Duration>,

    /// Limit on connecting to the host
    #[arg(long, default_value = "20s", value_parser = parse_timeout)]
    pub connect_timeout: Duration,

    /// Reject unknown host keys instead of trusting them on first use
    #[arg(long)]
    pub strict_host_key: bool,
}
