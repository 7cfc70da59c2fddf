// ABOUTME: Secret values sourced from environment variables.
// ABOUTME: Literal secrets in plan files are rejected at parse time.

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;

/// A reference to a secret held outside the plan file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSecret")]
pub struct SecretSource {
    pub env: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSecret {
    FromEnv { env: String },
    Literal(String),
}

impl TryFrom<RawSecret> for SecretSource {
    type Error = String;

    fn try_from(raw: RawSecret) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawSecret::FromEnv { env } if env.trim().is_empty() => {
                Err("secret env var name cannot be empty".to_string())
            }
            RawSecret::FromEnv { env } => Ok(SecretSource { env }),
            RawSecret::Literal(_) => Err(
                "literal secrets are not allowed in plan files; use `{ env: VAR_NAME }`"
                    .to_string(),
            ),
        }
    }
}

impl SecretSource {
    pub fn from_env(var: impl Into<String>) -> Self {
        Self { env: var.into() }
    }

    /// Read the secret from the environment.
    pub fn resolve(&self) -> Result<SecretString> {
        std::env::var(&self.env)
            .map(SecretString::new)
            .map_err(|_| Error::MissingEnvVar(self.env.clone()))
    }
}
