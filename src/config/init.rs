// ABOUTME: Plan scaffolding for new projects.
// ABOUTME: Writes a commented sshbatch.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::{HostConfig, PLAN_FILENAME};

/// Write a template plan into `dir`, optionally targeting `host` (`user@host:port`).
pub fn init_plan(dir: &Path, host: Option<&str>, force: bool) -> Result<()> {
    let plan_path = dir.join(PLAN_FILENAME);

    if plan_path.exists() && !force {
        return Err(Error::AlreadyExists(plan_path));
    }

    let host = match host {
        Some(h) => HostConfig::parse(h).map_err(Error::InvalidConfig)?,
        None => HostConfig::parse("deploy@server.example.com").map_err(Error::InvalidConfig)?,
    };

    std::fs::write(&plan_path, generate_template_yaml(&host))?;
    Ok(())
}

fn generate_template_yaml(host: &HostConfig) -> String {
    format!(
        r#"hosts:
  - host: {}
    port: {}
    user: {}
    connect_timeout: 20s
    auth_timeout: 20s
    # Unknown host keys are accepted and remembered (Trust-On-First-Use).
    # Set to false to require a pre-populated ~/.ssh/known_hosts.
    # trust_first_connection: true

# Credentials are never written here. Pick one:
# auth:
#   password: {{ env: SSHBATCH_PASSWORD }}
# auth:
#   key: ~/.ssh/id_ed25519
#   passphrase: {{ env: SSHBATCH_KEY_PASSPHRASE }}
# auth:
#   agent: true

defaults:
  read_timeout: 30s

steps:
  - label: containers
    run: docker ps --format "table {{{{.Names}}}}\t{{{{.Status}}}}" 2>&1
    expect_output: true
  - label: disk
    run: df -h /
"#,
        host.address,
        host.port,
        host.user.as_deref().unwrap_or("deploy")
    )
}
