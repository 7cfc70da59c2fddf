// ABOUTME: SSH transport built on russh.
// ABOUTME: Handles connection, host key policy, authentication, and command channels.

use super::error::{Error, Result};
use super::host::{Credential, Host};
use super::session::RemoteSession;
use super::transport::{ChannelEvent, CommandChannel, Connector, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use russh::client::{self, Config, Handle, Msg};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{Channel, ChannelMsg, Disconnect, Sig};
use secrecy::ExposeSecret;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(host: &Host) -> Self {
        Self {
            host: host.address.clone(),
            port: host.port,
            trust_on_first_use: host.trust_on_first_use,
            known_hosts_path: host.known_hosts_path.clone(),
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) if self.trust_on_first_use => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                let learn_result = match &self.known_hosts_path {
                    Some(path) => {
                        learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => learn_known_hosts(&self.host, self.port, server_public_key),
                };
                if let Err(e) = learn_result {
                    tracing::warn!("Failed to save host key to known_hosts: {}", e);
                }
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(russh::keys::Error::KeyChanged { line }) => {
                tracing::error!(
                    "host key for {}:{} does not match known_hosts line {}",
                    self.host,
                    self.port,
                    line
                );
                Ok(false)
            }
            // Unreadable known_hosts: same as an unknown host.
            Err(_) => Ok(self.trust_on_first_use),
        }
    }
}

/// Authentication method resolved from the credential.
enum AuthMethod {
    Password(secrecy::SecretString),
    Agent(AgentClient<UnixStream>),
    KeyFile(Arc<ssh_key::PrivateKey>),
}

/// Opens russh connections.
#[derive(Debug, Clone)]
pub struct RusshConnector {
    /// Interval between keepalive messages while a command is silent.
    pub keepalive_interval: Duration,
}

impl Default for RusshConnector {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(15),
        }
    }
}

#[async_trait]
impl Connector for RusshConnector {
    type Transport = RusshTransport;

    async fn connect(&self, host: &Host) -> Result<RusshTransport> {
        // Long silent commands rely on keepalives rather than an inactivity cutoff.
        let russh_config = Config {
            inactivity_timeout: None,
            keepalive_interval: Some(self.keepalive_interval),
            ..Default::default()
        };

        let handler = SshHandler::new(host);
        let connecting = client::connect(
            Arc::new(russh_config),
            (host.address.as_str(), host.port),
            handler,
        );

        let mut handle = tokio::time::timeout(host.connect_timeout, connecting)
            .await
            .map_err(|_| Error::ConnectTimeout {
                host: format!("{}:{}", host.address, host.port),
                timeout: host.connect_timeout,
            })?
            .map_err(|e| connection_error(host, e))?;

        let authenticated = tokio::time::timeout(host.auth_timeout, authenticate(&mut handle, host))
            .await
            .map_err(|_| Error::AuthTimeout(host.auth_timeout))??;

        if !authenticated {
            return Err(Error::AuthenticationFailed(format!(
                "server rejected {} credentials for {}",
                host.credential.kind(),
                host.user
            )));
        }

        Ok(RusshTransport {
            handle: Arc::new(handle),
        })
    }
}

fn connection_error(host: &Host, e: russh::Error) -> Error {
    match e {
        russh::Error::UnknownKey => Error::Connection(format!(
            "host key for {}:{} was not accepted",
            host.address, host.port
        )),
        russh::Error::IO(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            Error::Connection(format!(
                "connection refused to {}:{}",
                host.address, host.port
            ))
        }
        other => Error::Connection(other.to_string()),
    }
}

/// Resolve which authentication method to use.
async fn resolve_auth_method(credential: &Credential) -> Result<AuthMethod> {
    match credential {
        Credential::Password(password) => Ok(AuthMethod::Password(password.clone())),
        Credential::KeyFile { path, passphrase } => {
            let passphrase = passphrase.as_ref().map(|p| p.expose_secret().as_str());
            let key = load_secret_key(path, passphrase).map_err(|e| Error::KeyLoadFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            Ok(AuthMethod::KeyFile(Arc::new(key)))
        }
        Credential::Agent => AgentClient::connect_env()
            .await
            .map(AuthMethod::Agent)
            .map_err(|e| Error::AgentUnavailable(e.to_string())),
        Credential::Auto => {
            if let Ok(agent) = AgentClient::connect_env().await {
                return Ok(AuthMethod::Agent(agent));
            }

            // Fall back to default key locations
            let home = std::env::var("HOME").map_err(|_| {
                Error::AgentUnavailable("SSH agent not available and HOME not set".to_string())
            })?;

            let default_keys = [
                format!("{}/.ssh/id_ed25519", home),
                format!("{}/.ssh/id_rsa", home),
                format!("{}/.ssh/id_ecdsa", home),
            ];

            for key_path in &default_keys {
                if let Ok(key) = load_secret_key(key_path, None) {
                    return Ok(AuthMethod::KeyFile(Arc::new(key)));
                }
            }

            Err(Error::AgentUnavailable(
                "SSH agent not available and no default keys found".to_string(),
            ))
        }
    }
}

/// Authenticate the connection.
async fn authenticate(handle: &mut Handle<SshHandler>, host: &Host) -> Result<bool> {
    match resolve_auth_method(&host.credential).await? {
        AuthMethod::Password(password) => {
            let result = handle
                .authenticate_password(&host.user, password.expose_secret())
                .await
                .map_err(Error::Protocol)?;
            Ok(result.success())
        }
        AuthMethod::Agent(mut agent) => {
            let keys = agent.request_identities().await.map_err(|e| {
                Error::AgentUnavailable(format!("failed to list agent keys: {}", e))
            })?;

            if keys.is_empty() {
                return Err(Error::AgentUnavailable("no keys in SSH agent".to_string()));
            }

            for key in &keys {
                match handle
                    .authenticate_publickey_with(&host.user, key.clone(), None, &mut agent)
                    .await
                {
                    Ok(result) if result.success() => return Ok(true),
                    _ => continue,
                }
            }
            Ok(false)
        }
        AuthMethod::KeyFile(key) => {
            let hash_alg = handle
                .best_supported_rsa_hash()
                .await
                .map_err(Error::Protocol)?
                .flatten();

            let result = handle
                .authenticate_publickey(&host.user, PrivateKeyWithHashAlg::new(key, hash_alg))
                .await
                .map_err(Error::Protocol)?;

            Ok(result.success())
        }
    }
}

/// An authenticated russh connection.
pub struct RusshTransport {
    handle: Arc<Handle<SshHandler>>,
}

impl std::fmt::Debug for RusshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshTransport")
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

#[async_trait]
impl Transport for RusshTransport {
    type Channel = RusshChannel;

    async fn open_channel(&self) -> Result<RusshChannel> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel(format!("failed to open channel: {}", e)))?;
        Ok(RusshChannel { channel })
    }

    fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    async fn close(&self) -> Result<()> {
        if self.handle.is_closed() {
            return Ok(());
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)
    }
}

/// One russh session channel.
pub struct RusshChannel {
    channel: Channel<Msg>,
}

#[async_trait]
impl CommandChannel for RusshChannel {
    async fn exec(&mut self, command: &str) -> Result<()> {
        self.channel
            .exec(true, command)
            .await
            .map_err(|e| Error::Channel(format!("failed to exec command: {}", e)))
    }

    async fn next_event(&mut self) -> Result<Option<ChannelEvent>> {
        loop {
            match self.channel.wait().await {
                Some(msg) => match channel_event(msg) {
                    Mapped::Event(event) => return Ok(Some(event)),
                    Mapped::Closed => return Ok(None),
                    Mapped::Skip => {}
                },
                None => return Ok(None),
            }
        }
    }
}

/// What a single russh channel message means to the read loop.
#[derive(Debug, PartialEq, Eq)]
enum Mapped {
    Event(ChannelEvent),
    Closed,
    /// Window adjustments, success replies and the like.
    Skip,
}

fn channel_event(msg: ChannelMsg) -> Mapped {
    match msg {
        ChannelMsg::Data { data } => Mapped::Event(ChannelEvent::Output(Bytes::copy_from_slice(&data))),
        // stderr is interleaved with stdout in arrival order
        ChannelMsg::ExtendedData { data, .. } => {
            Mapped::Event(ChannelEvent::Output(Bytes::copy_from_slice(&data)))
        }
        ChannelMsg::ExitStatus { exit_status } => Mapped::Event(ChannelEvent::ExitStatus(exit_status)),
        ChannelMsg::ExitSignal { signal_name, .. } => {
            Mapped::Event(ChannelEvent::ExitSignal(signal_label(&signal_name)))
        }
        ChannelMsg::Eof => Mapped::Event(ChannelEvent::Eof),
        ChannelMsg::Close => Mapped::Closed,
        _ => Mapped::Skip,
    }
}

/// Signal name without the `SIG` prefix, e.g. `KILL`.
fn signal_label(signal: &Sig) -> String {
    match signal {
        Sig::Custom(name) => name.trim_start_matches("SIG").to_string(),
        other => format!("{other:?}"),
    }
}

impl RemoteSession<RusshTransport> {
    /// Connect to the host over SSH with default transport settings.
    pub async fn open(host: Host) -> Result<Self> {
        Self::connect(&RusshConnector::default(), host).await
    }
}
