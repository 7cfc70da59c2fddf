// ABOUTME: Plan file types and parsing for sshbatch.yml.
// ABOUTME: Handles YAML parsing, plan discovery, secret resolution, and destination merging.

mod auth;
mod deserialize;
mod host;
mod init;
mod secret;
mod step;

pub use auth::{AuthConfig, resolve_optional};
pub use host::HostConfig;
pub use init::init_plan;
pub use secret::SecretSource;
pub use step::{StepConfig, StepDefaults, StepEntry};

use crate::batch::{ReportLimits, StepSpec};
use crate::error::{Error, Result};
use crate::ssh;
use deserialize::{deserialize_hosts, deserialize_hosts_option, deserialize_steps};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const PLAN_FILENAME: &str = "sshbatch.yml";
pub const PLAN_FILENAME_ALT: &str = "sshbatch.yaml";
pub const PLAN_FILENAME_DIR: &str = ".sshbatch/plan.yml";

/// A batch plan: which hosts to visit and which commands to run on each.
#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    #[serde(deserialize_with = "deserialize_hosts")]
    pub hosts: NonEmpty<HostConfig>,

    #[serde(default)]
    pub auth: Option<AuthConfig>,

    #[serde(default)]
    pub defaults: StepDefaults,

    #[serde(default)]
    pub report: ReportLimits,

    #[serde(deserialize_with = "deserialize_steps")]
    pub steps: NonEmpty<StepEntry>,

    #[serde(default)]
    pub destinations: HashMap<String, Destination>,
}

/// Named overrides selected with `--destination`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Destination {
    #[serde(default, deserialize_with = "deserialize_hosts_option")]
    pub hosts: Option<NonEmpty<HostConfig>>,

    #[serde(default)]
    pub auth: Option<AuthConfig>,

    #[serde(default)]
    pub defaults: Option<StepDefaults>,
}

impl Plan {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find the plan file in `dir`.
    pub fn locate(dir: &Path) -> Result<PathBuf> {
        [PLAN_FILENAME, PLAN_FILENAME_ALT, PLAN_FILENAME_DIR]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
            .ok_or_else(|| Error::PlanNotFound(dir.to_path_buf()))
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        Self::load(&Self::locate(dir)?)
    }

    pub fn for_destination(&self, name: &str) -> Result<Plan> {
        let dest = self
            .destinations
            .get(name)
            .ok_or_else(|| Error::UnknownDestination(name.to_string()))?;

        let mut merged = self.clone();

        if let Some(ref hosts) = dest.hosts {
            merged.hosts = hosts.clone();
        }

        if dest.auth.is_some() {
            merged.auth = dest.auth.clone();
        }

        if let Some(ref defaults) = dest.defaults {
            merged.defaults = defaults.clone();
        }

        Ok(merged)
    }

    /// Steps with defaults applied, in plan order.
    pub fn step_specs(&self) -> Vec<StepSpec> {
        self.steps
            .iter()
            .map(|entry| entry.to_spec(&self.defaults))
            .collect()
    }

    /// Connection parameters for every host, with secrets read from the environment.
    pub fn resolve_hosts(&self) -> Result<Vec<ssh::Host>> {
        let credential = resolve_optional(self.auth.as_ref())?;
        self.hosts
            .iter()
            .map(|config| -> Result<ssh::Host> {
                let host = config.to_host(credential.clone());
                host.validate()?;
                Ok(host)
            })
            .collect()
    }
}
