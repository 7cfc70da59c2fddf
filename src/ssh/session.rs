// ABOUTME: Remote session lifecycle and bounded command execution.
// ABOUTME: Drives one channel per command and collects output under read timeouts.

use super::command::{CommandRequest, CommandResult, Completion};
use super::error::{Error, Result};
use super::host::Host;
use super::transport::{ChannelEvent, CommandChannel, Connector, Transport};
use futures::future::BoxFuture;
use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle of a session. Transitions are one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Open,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unopened => "unopened",
            SessionState::Open => "open",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

enum Slot<T> {
    Unopened,
    Open(T),
    Closed,
}

/// A session bound to one host.
pub struct RemoteSession<T: Transport> {
    host: Host,
    slot: Slot<T>,
}

impl<T: Transport> fmt::Debug for RemoteSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSession")
            .field("host", &self.host)
            .field("state", &self.state())
            .finish()
    }
}

impl<T: Transport> RemoteSession<T> {
    /// Create an unopened session for the host.
    pub fn new(host: Host) -> Self {
        Self {
            host,
            slot: Slot::Unopened,
        }
    }

    /// Create a session and open it in one step.
    pub async fn connect<C>(connector: &C, host: Host) -> Result<Self>
    where
        C: Connector<Transport = T>,
    {
        let mut session = Self::new(host);
        session.open_with(connector).await?;
        Ok(session)
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn state(&self) -> SessionState {
        match self.slot {
            Slot::Unopened => SessionState::Unopened,
            Slot::Open(_) => SessionState::Open,
            Slot::Closed => SessionState::Closed,
        }
    }

    /// Connect and authenticate. Only valid on an unopened session.
    pub async fn open_with<C>(&mut self, connector: &C) -> Result<()>
    where
        C: Connector<Transport = T>,
    {
        if !matches!(self.slot, Slot::Unopened) {
            return Err(Error::InvalidState {
                operation: "open",
                state: self.state(),
            });
        }
        self.host.validate()?;

        tracing::debug!(
            host = %self.host,
            credential = self.host.credential.kind(),
            "opening session"
        );
        let transport = connector.connect(&self.host).await?;
        self.slot = Slot::Open(transport);
        tracing::info!(host = %self.host, "session open");
        Ok(())
    }

    fn transport(&self, operation: &'static str) -> Result<&T> {
        match &self.slot {
            Slot::Open(transport) => Ok(transport),
            _ => Err(Error::InvalidState {
                operation,
                state: self.state(),
            }),
        }
    }

    /// Run a command and collect its output.
    pub async fn execute(&self, request: &CommandRequest) -> Result<CommandResult> {
        self.execute_with(request, &mut |_: &[u8]| {}).await
    }

    /// Run a command, handing each output chunk to `sink` as it arrives.
    ///
    /// Only channel setup can fail. Once the command is dispatched, read
    /// timeouts and read errors end the loop and are reported through
    /// [`CommandResult::completion`] with whatever output was buffered.
    pub async fn execute_with(
        &self,
        request: &CommandRequest,
        sink: &mut (dyn FnMut(&[u8]) + Send),
    ) -> Result<CommandResult> {
        let transport = self.transport("execute")?;
        if request.command.trim().is_empty() {
            return Err(Error::InvalidRequest("command cannot be empty".to_string()));
        }
        if request.read_timeout.is_zero() {
            return Err(Error::InvalidRequest(
                "read timeout must be greater than zero".to_string(),
            ));
        }
        if request.deadline.is_some_and(|d| d.is_zero()) {
            return Err(Error::InvalidRequest(
                "deadline must be greater than zero".to_string(),
            ));
        }

        tracing::debug!(host = %self.host, command = %request.command, "dispatching command");
        let started = Instant::now();

        let mut channel = transport
            .open_channel()
            .await
            .map_err(|e| lost_or(transport, e))?;
        channel
            .exec(&request.command)
            .await
            .map_err(|e| lost_or(transport, e))?;

        let (output, exit_code, completion) = read_output(&mut channel, request, started, sink).await;
        let elapsed = started.elapsed();

        match &completion {
            Completion::Exited => {
                tracing::debug!(exit_code = ?exit_code, ?elapsed, "command finished")
            }
            Completion::ReadTruncated(reason) => {
                tracing::warn!(%reason, bytes = output.len(), "read error, output may be truncated")
            }
            Completion::Signaled(signal) => {
                tracing::warn!(%signal, ?elapsed, "remote process terminated by signal")
            }
            other => tracing::warn!(completion = ?other, bytes = output.len(), "command did not finish in time"),
        }

        Ok(CommandResult {
            output,
            exit_code,
            elapsed,
            completion,
        })
    }

    /// Release the connection. Calling it again, or on an unopened session, does nothing.
    pub async fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.slot, Slot::Closed) {
            Slot::Open(transport) => {
                tracing::debug!(host = %self.host, "closing session");
                transport.close().await
            }
            Slot::Unopened | Slot::Closed => Ok(()),
        }
    }
}

impl<T: Transport> Drop for RemoteSession<T> {
    fn drop(&mut self) {
        if matches!(self.slot, Slot::Open(_)) {
            tracing::warn!(host = %self.host, "session dropped while open; connection released without disconnect");
        }
    }
}

fn lost_or<T: Transport>(transport: &T, error: Error) -> Error {
    if transport.is_closed() {
        Error::Disconnected
    } else {
        error
    }
}

async fn read_output<C: CommandChannel>(
    channel: &mut C,
    request: &CommandRequest,
    started: Instant,
    sink: &mut (dyn FnMut(&[u8]) + Send),
) -> (Vec<u8>, Option<u32>, Completion) {
    let mut output = Vec::new();
    let mut exit_code = None;
    let mut signal: Option<String> = None;
    let mut got_eof = false;

    let completion = loop {
        let (wait, deadline_bound) = next_wait(request, started.elapsed());
        if deadline_bound && wait.is_zero() {
            break Completion::DeadlineExceeded;
        }

        match tokio::time::timeout(wait, channel.next_event()).await {
            // A signal already reported is the better explanation for a stall or a broken read.
            Err(_) | Ok(Err(_)) if signal.is_some() => {
                break Completion::Signaled(signal.take().unwrap_or_default());
            }
            Err(_) if deadline_bound => break Completion::DeadlineExceeded,
            Err(_) => break Completion::ReadTimeout,
            Ok(Err(e)) => break Completion::ReadTruncated(e.to_string()),
            Ok(Ok(None)) => {
                if let Some(name) = signal.take() {
                    break Completion::Signaled(name);
                }
                if exit_code.is_some() {
                    break Completion::Exited;
                }
                break Completion::ReadTruncated("channel closed without exit status".to_string());
            }
            Ok(Ok(Some(ChannelEvent::Output(data)))) => {
                sink(&data);
                output.extend_from_slice(&data);
            }
            Ok(Ok(Some(ChannelEvent::ExitStatus(status)))) => {
                exit_code = Some(status);
                if got_eof {
                    break Completion::Exited;
                }
            }
            Ok(Ok(Some(ChannelEvent::ExitSignal(name)))) => {
                if got_eof {
                    break Completion::Signaled(name);
                }
                signal = Some(name);
            }
            Ok(Ok(Some(ChannelEvent::Eof))) => {
                got_eof = true;
                if let Some(name) = signal.take() {
                    break Completion::Signaled(name);
                }
                if exit_code.is_some() {
                    break Completion::Exited;
                }
            }
        }
    };

    // An exit status that arrived before a stall still belongs to the result,
    // but the timeout contract leaves it unset.
    if completion != Completion::Exited {
        exit_code = None;
    }

    (output, exit_code, completion)
}

/// How long the next read may wait, and whether that bound comes from the deadline.
fn next_wait(request: &CommandRequest, elapsed: Duration) -> (Duration, bool) {
    match request.deadline {
        Some(deadline) => {
            let remaining = deadline.saturating_sub(elapsed);
            if remaining <= request.read_timeout {
                (remaining, true)
            } else {
                (request.read_timeout, false)
            }
        }
        None => (request.read_timeout, false),
    }
}

/// Open a session, run `f` against it, and close it on every exit path.
///
/// A close failure is logged rather than returned since the work in `f` has
/// already completed.
pub async fn with_session<C, F, R>(connector: &C, host: Host, f: F) -> Result<R>
where
    C: Connector,
    F: for<'s> FnOnce(&'s RemoteSession<C::Transport>) -> BoxFuture<'s, R>,
{
    let mut session = RemoteSession::connect(connector, host).await?;
    let value = f(&session).await;
    if let Err(e) = session.close().await {
        tracing::warn!(host = %session.host(), error = %e, "failed to close session cleanly");
    }
    Ok(value)
}
