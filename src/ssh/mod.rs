// ABOUTME: SSH session layer for remote command execution.
// ABOUTME: A transport trait seam with a russh implementation and a bounded execute loop.

mod client;
mod command;
mod error;
mod host;
mod session;
mod transport;

pub use client::{RusshChannel, RusshConnector, RusshTransport};
pub use command::{CommandRequest, CommandResult, Completion, DEFAULT_READ_TIMEOUT};
pub use error::{Error, Result};
pub use host::{
    Credential, DEFAULT_AUTH_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT, Host,
};
pub use session::{RemoteSession, SessionState, with_session};
pub use transport::{ChannelEvent, CommandChannel, Connector, Transport};
