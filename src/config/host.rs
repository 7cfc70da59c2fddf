// ABOUTME: Host entries for plan files.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@host:port".

use crate::ssh::{self, Credential, DEFAULT_AUTH_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    #[serde(alias = "host")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_auth_timeout", with = "humantime_serde")]
    pub auth_timeout: Duration,
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_auth_timeout() -> Duration {
    DEFAULT_AUTH_TIMEOUT
}

fn default_trust_first_connection() -> bool {
    true
}

impl HostConfig {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("host address cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port], with IPv6 as [addr]:port
        let (user_part, rest) = match s.rfind('@') {
            Some(at_pos) => (Some(&s[..at_pos]), &s[at_pos + 1..]),
            None => (None, s),
        };

        let (address, port_str) = if let Some(bracketed) = rest.strip_prefix('[') {
            let close = bracketed
                .find(']')
                .ok_or_else(|| format!("unterminated IPv6 address: {}", rest))?;
            let port = bracketed[close + 1..].strip_prefix(':');
            (&bracketed[..close], port)
        } else {
            match rest.rfind(':') {
                Some(colon_pos) => (&rest[..colon_pos], Some(&rest[colon_pos + 1..])),
                None => (rest, None),
            }
        };

        let port = match port_str {
            Some(p) => p
                .parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| format!("invalid port: {}", p))?,
            None => DEFAULT_PORT,
        };

        if address.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }
        if user_part.is_some_and(str::is_empty) {
            return Err("user cannot be empty".to_string());
        }

        Ok(HostConfig {
            address: address.to_string(),
            port,
            user: user_part.map(|s| s.to_string()),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            trust_first_connection: true,
            known_hosts: None,
        })
    }

    /// The user to log in as, falling back to $USER and then root.
    pub fn effective_user(&self) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()))
    }

    /// Build connection parameters with the given credential.
    pub fn to_host(&self, credential: Credential) -> ssh::Host {
        let mut host = ssh::Host::new(&self.address, self.effective_user())
            .port(self.port)
            .credential(credential)
            .connect_timeout(self.connect_timeout)
            .auth_timeout(self.auth_timeout)
            .trust_on_first_use(self.trust_first_connection);
        if let Some(path) = &self.known_hosts {
            host = host.known_hosts_path(path);
        }
        host
    }
}
