// ABOUTME: Exec command implementation.
// ABOUTME: Runs one ad-hoc command on a single host and prints its full output.

use crate::cli::ExecArgs;
use sshbatch::batch::{BatchRunner, Classification, StepSpec};
use sshbatch::config::{AuthConfig, HostConfig, SecretSource};
use sshbatch::error::{Error, Result};
use sshbatch::output::Output;
use sshbatch::ssh::{CommandRequest, Credential, RusshConnector, with_session};
use std::io::Write;

/// Execute a single command. Returns true when it passed.
pub async fn exec_command(args: ExecArgs, output: &Output) -> Result<bool> {
    let mut host_config = HostConfig::parse(&args.target).map_err(Error::InvalidConfig)?;
    host_config.connect_timeout = args.connect_timeout;
    host_config.trust_first_connection = !args.strict_host_key;

    let host = host_config.to_host(credential(&args)?);
    host.validate()?;

    let command = args.command.join(" ");
    let mut request = CommandRequest::new(&command).read_timeout(args.read_timeout);
    if let Some(deadline) = args.deadline {
        request = request.deadline(deadline);
    }

    output.progress(&format!("  → Connecting to {}...", host));
    let steps = vec![StepSpec::new(command, request)];
    let outcome = with_session(&RusshConnector::default(), host, move |session| {
        Box::pin(async move { BatchRunner::new().run_all(session, steps).await })
    })
    .await?;

    if let Some(e) = outcome.aborted {
        return Err(e.into());
    }

    let Some(step) = outcome.steps.into_iter().next() else {
        return Ok(false);
    };

    // Full output, untruncated, as the remote shell produced it.
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(step.output())?;
    stdout.flush()?;

    match step.classification {
        Classification::Pass => Ok(true),
        _ => {
            output.error(step.note.as_deref().unwrap_or("command did not pass"));
            Ok(false)
        }
    }
}

fn credential(args: &ExecArgs) -> Result<Credential> {
    if let Some(var) = &args.password_env {
        return AuthConfig::Password {
            password: SecretSource::from_env(var),
        }
        .resolve();
    }
    if let Some(key) = &args.key {
        return AuthConfig::Key {
            key: key.clone(),
            passphrase: None,
        }
        .resolve();
    }
    if args.agent {
        return Ok(Credential::Agent);
    }
    Ok(Credential::Auto)
}
