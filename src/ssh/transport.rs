// ABOUTME: Narrow transport contract the session layer depends on.
// ABOUTME: Implemented by the russh client and by in-memory transports in tests.

use super::error::Result;
use super::host::Host;
use async_trait::async_trait;
use bytes::Bytes;

/// One event read from a command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A chunk of stdout or stderr, in the order the remote delivered it.
    Output(Bytes),
    /// The remote process reported its exit status.
    ExitStatus(u32),
    /// The remote process was terminated by the named signal.
    ExitSignal(String),
    /// The remote side will send no more data.
    Eof,
}

/// Opens authenticated transports to hosts.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    /// Connect and authenticate, honouring the host's connect and auth timeouts.
    async fn connect(&self, host: &Host) -> Result<Self::Transport>;
}

/// A live authenticated connection able to carry command channels.
#[async_trait]
pub trait Transport: Send + Sync {
    type Channel: CommandChannel;

    async fn open_channel(&self) -> Result<Self::Channel>;

    /// Whether the underlying connection has gone away.
    fn is_closed(&self) -> bool;

    /// Release the connection.
    async fn close(&self) -> Result<()>;
}

/// A single logical channel running one remote command.
#[async_trait]
pub trait CommandChannel: Send {
    /// Dispatch the command string verbatim to the remote shell.
    async fn exec(&mut self, command: &str) -> Result<()>;

    /// Wait for the next event. `Ok(None)` means the channel has closed.
    async fn next_event(&mut self) -> Result<Option<ChannelEvent>>;
}
