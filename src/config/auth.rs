// ABOUTME: Authentication settings for plan files.
// ABOUTME: Resolves password, key file, or agent settings into an SSH credential.

use super::secret::SecretSource;
use crate::error::Result;
use crate::ssh::Credential;
use serde::Deserialize;
use std::path::PathBuf;

/// Exactly one of `password`, `key`, or `agent`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAuth")]
pub enum AuthConfig {
    Password {
        password: SecretSource,
    },
    Key {
        key: PathBuf,
        #[serde(default)]
        passphrase: Option<SecretSource>,
    },
    Agent {
        agent: bool,
    },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAuth {
    password: Option<SecretSource>,
    key: Option<PathBuf>,
    passphrase: Option<SecretSource>,
    agent: Option<bool>,
}

impl TryFrom<RawAuth> for AuthConfig {
    type Error = String;

    fn try_from(raw: RawAuth) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawAuth {
                password: Some(password),
                key: None,
                passphrase: None,
                agent: None,
            } => Ok(AuthConfig::Password { password }),
            RawAuth {
                password: None,
                key: Some(key),
                passphrase,
                agent: None,
            } => Ok(AuthConfig::Key { key, passphrase }),
            RawAuth {
                password: None,
                key: None,
                passphrase: None,
                agent: Some(agent),
            } => Ok(AuthConfig::Agent { agent }),
            RawAuth {
                key: None,
                passphrase: Some(_),
                ..
            } => Err("auth `passphrase` requires `key`".to_string()),
            _ => Err("auth needs exactly one of `password`, `key`, or `agent`".to_string()),
        }
    }
}

impl AuthConfig {
    /// Read any referenced secrets and build the credential.
    pub fn resolve(&self) -> Result<Credential> {
        match self {
            AuthConfig::Password { password } => Ok(Credential::Password(password.resolve()?)),
            AuthConfig::Key { key, passphrase } => Ok(Credential::KeyFile {
                path: expand_home(key),
                passphrase: passphrase.as_ref().map(SecretSource::resolve).transpose()?,
            }),
            AuthConfig::Agent { agent: true } => Ok(Credential::Agent),
            AuthConfig::Agent { agent: false } => Ok(Credential::Auto),
        }
    }
}

/// Credential used when a plan has no `auth` section.
pub fn resolve_optional(auth: Option<&AuthConfig>) -> Result<Credential> {
    auth.map(AuthConfig::resolve).unwrap_or(Ok(Credential::Auto))
}

fn expand_home(path: &std::path::Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var("HOME")) {
        (Ok(rest), Ok(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn parse_variants() {
        let auth: AuthConfig = serde_yaml::from_str("password: { env: PW }").unwrap();
        assert!(matches!(auth, AuthConfig::Password { .. }));

        let auth: AuthConfig = serde_yaml::from_str("key: /keys/id_ed25519").unwrap();
        assert!(matches!(auth, AuthConfig::Key { passphrase: None, .. }));

        let auth: AuthConfig = serde_yaml::from_str("agent: true").unwrap();
        assert_eq!(auth, AuthConfig::Agent { agent: true });
    }

    #[test]
    fn key_with_passphrase() {
        let auth: AuthConfig =
            serde_yaml::from_str("key: /keys/id_rsa\npassphrase: { env: KEY_PASS }").unwrap();
        assert_eq!(
            auth,
            AuthConfig::Key {
                key: PathBuf::from("/keys/id_rsa"),
                passphrase: Some(SecretSource::from_env("KEY_PASS")),
            }
        );
    }

    #[test]
    fn literal_password_does_not_parse() {
        let err = serde_yaml::from_str::<AuthConfig>("password: hunter2").unwrap_err();
        assert!(err.to_string().contains("literal secrets are not allowed"));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn conflicting_methods_rejected() {
        let err = serde_yaml::from_str::<AuthConfig>("password: { env: PW }\nagent: true")
            .unwrap_err();
        assert!(err.to_string().contains("exactly one"));

        let err = serde_yaml::from_str::<AuthConfig>("passphrase: { env: PW }").unwrap_err();
        assert!(err.to_string().contains("requires `key`"));

        assert!(serde_yaml::from_str::<AuthConfig>("{}").is_err());
        assert!(serde_yaml::from_str::<AuthConfig>("token: abc").is_err());
    }

    #[test]
    fn key_path_expands_home() {
        temp_env::with_var("HOME", Some("/home/ops"), || {
            let auth = AuthConfig::Key {
                key: PathBuf::from("~/.ssh/deploy"),
                passphrase: None,
            };
            match auth.resolve().unwrap() {
                Credential::KeyFile { path, .. } => {
                    assert_eq!(path, PathBuf::from("/home/ops/.ssh/deploy"))
                }
                other => panic!("expected key credential, got {:?}", other),
            }
        });
    }

    #[test]
    fn missing_password_env_fails() {
        temp_env::with_var_unset("SSHBATCH_AUTH_TEST_PW", || {
            let auth = AuthConfig::Password {
                password: SecretSource::from_env("SSHBATCH_AUTH_TEST_PW"),
            };
            assert!(matches!(auth.resolve(), Err(Error::MissingEnvVar(_))));
        });
    }

    #[test]
    fn no_auth_section_means_auto() {
        assert_eq!(resolve_optional(None).unwrap().kind(), "auto");
    }
}
