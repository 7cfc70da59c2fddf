// ABOUTME: Connection parameters for a single remote host.
// ABOUTME: Holds address, credential material, timeouts, and host key policy.

use super::error::{Error, Result};
use secrecy::SecretString;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(20);

/// How the session proves its identity to the remote host.
#[derive(Clone)]
pub enum Credential {
    /// Password authentication.
    Password(SecretString),
    /// Private key file, optionally encrypted.
    KeyFile {
        path: PathBuf,
        passphrase: Option<SecretString>,
    },
    /// Keys offered by the running SSH agent.
    Agent,
    /// SSH agent if available, then the default key locations under ~/.ssh.
    Auto,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::KeyFile { path, passphrase } => f
                .debug_struct("KeyFile")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Credential::Agent => f.write_str("Agent"),
            Credential::Auto => f.write_str("Auto"),
        }
    }
}

impl Credential {
    /// Short description safe for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Password(_) => "password",
            Credential::KeyFile { .. } => "key",
            Credential::Agent => "agent",
            Credential::Auto => "auto",
        }
    }
}

/// A remote host and everything needed to open a session to it.
#[derive(Debug, Clone)]
pub struct Host {
    /// Hostname or IP address.
    pub address: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    pub credential: Credential,
    /// Upper bound on TCP connect plus key exchange.
    pub connect_timeout: Duration,
    /// Upper bound on credential negotiation.
    pub auth_timeout: Duration,
    /// Whether to accept and remember unknown host keys (Trust On First Use).
    /// A key that differs from a remembered one is always rejected.
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
}

impl Host {
    pub fn new(address: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: DEFAULT_PORT,
            user: user.into(),
            credential: Credential::Auto,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            trust_on_first_use: true,
            known_hosts_path: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Check the fields a connection attempt relies on.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::InvalidHost("address cannot be empty".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(Error::InvalidHost("user cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::InvalidHost("port must be between 1 and 65535".to_string()));
        }
        if self.connect_timeout.is_zero() || self.auth_timeout.is_zero() {
            return Err(Error::InvalidHost("timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.address, self.port)
    }
}
