// ABOUTME: Scripted in-memory transport for exercising sessions without a network.
// ABOUTME: Each command maps to a list of channel events played back in order.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use sshbatch::ssh::{ChannelEvent, CommandChannel, Connector, Error, Host, Result, Transport};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// One scripted action on a command channel.
#[derive(Debug, Clone)]
pub enum Event {
    Output(String),
    Exit(u32),
    /// Report termination by the named signal.
    Signal(String),
    Eof,
    /// Sleep before the next event.
    Delay(Duration),
    /// Never produce another event.
    Hang,
    /// Fail the read with a channel error.
    Fail(String),
    /// Drop the whole connection, then fail the read.
    Disconnect,
}

/// Script for a command that prints `output` and exits with `code`.
pub fn prints(output: &str, code: u32) -> Vec<Event> {
    vec![
        Event::Output(output.to_string()),
        Event::Exit(code),
        Event::Eof,
    ]
}

#[derive(Default)]
struct Shared {
    scripts: Mutex<HashMap<String, Vec<Event>>>,
    unreachable: Mutex<HashSet<String>>,
    auth_rejected: Mutex<HashSet<String>>,
    auth_stalled: Mutex<HashSet<String>>,
    executed: Mutex<Vec<String>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

/// Connector whose transports play back scripted events.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    shared: Arc<Shared>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the events for `command`. Unscripted commands exit 127.
    pub fn script(self, command: &str, events: Vec<Event>) -> Self {
        self.shared
            .scripts
            .lock()
            .insert(command.to_string(), events);
        self
    }

    /// Refuse connections to `address`.
    pub fn unreachable(self, address: &str) -> Self {
        self.shared.unreachable.lock().insert(address.to_string());
        self
    }

    /// Accept the connection to `address` but reject its credentials.
    pub fn rejects_auth(self, address: &str) -> Self {
        self.shared.auth_rejected.lock().insert(address.to_string());
        self
    }

    /// Accept the connection to `address` but never finish authentication.
    pub fn stalls_auth(self, address: &str) -> Self {
        self.shared.auth_stalled.lock().insert(address.to_string());
        self
    }

    /// Every command dispatched so far, across all transports.
    pub fn executed(&self) -> Vec<String> {
        self.shared.executed.lock().clone()
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self, host: &Host) -> Result<ScriptedTransport> {
        if self.shared.unreachable.lock().contains(&host.address) {
            return Err(Error::Connection(format!(
                "{}:{}: connection refused",
                host.address, host.port
            )));
        }
        if self.shared.auth_rejected.lock().contains(&host.address) {
            return Err(Error::AuthenticationFailed(format!(
                "server rejected {} credentials for {}",
                host.credential.kind(),
                host.user
            )));
        }
        if self.shared.auth_stalled.lock().contains(&host.address) {
            return Err(Error::AuthTimeout(host.auth_timeout));
        }
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedTransport {
            shared: Arc::clone(&self.shared),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

pub struct ScriptedTransport {
    shared: Arc<Shared>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Channel = ScriptedChannel;

    async fn open_channel(&self) -> Result<ScriptedChannel> {
        if self.is_closed() {
            return Err(Error::Channel("transport is closed".to_string()));
        }
        Ok(ScriptedChannel {
            shared: Arc::clone(&self.shared),
            closed: Arc::clone(&self.closed),
            events: VecDeque::new(),
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct ScriptedChannel {
    shared: Arc<Shared>,
    closed: Arc<AtomicBool>,
    events: VecDeque<Event>,
}

#[async_trait]
impl CommandChannel for ScriptedChannel {
    async fn exec(&mut self, command: &str) -> Result<()> {
        self.shared.executed.lock().push(command.to_string());
        let events = self
            .shared
            .scripts
            .lock()
            .get(command)
            .cloned()
            .unwrap_or_else(|| prints("command not found\n", 127));
        self.events = events.into();
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<ChannelEvent>> {
        loop {
            let Some(event) = self.events.pop_front() else {
                return Ok(None);
            };
            match event {
                Event::Output(text) => {
                    return Ok(Some(ChannelEvent::Output(Bytes::from(text))));
                }
                Event::Exit(code) => return Ok(Some(ChannelEvent::ExitStatus(code))),
                Event::Signal(name) => return Ok(Some(ChannelEvent::ExitSignal(name))),
                Event::Eof => return Ok(Some(ChannelEvent::Eof)),
                Event::Delay(duration) => tokio::time::sleep(duration).await,
                Event::Hang => {
                    self.events.push_front(Event::Hang);
                    return std::future::pending().await;
                }
                Event::Fail(reason) => return Err(Error::Channel(reason)),
                Event::Disconnect => {
                    self.closed.store(true, Ordering::SeqCst);
                    return Err(Error::Channel("connection reset by peer".to_string()));
                }
            }
        }
    }
}
