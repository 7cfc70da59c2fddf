// ABOUTME: SSH-specific error types.
// ABOUTME: Covers connection, authentication, session state, and channel failures.

use super::session::SessionState;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid host: {0}")]
    InvalidHost(String),

    #[error("invalid command request: {0}")]
    InvalidRequest(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("connection to {host} timed out after {timeout:?}")]
    ConnectTimeout { host: String, timeout: Duration },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("authentication timed out after {0:?}")]
    AuthTimeout(Duration),

    #[error("SSH agent not available: {0}")]
    AgentUnavailable(String),

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("cannot {operation} a session in state {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("channel failed: {0}")]
    Channel(String),

    #[error("connection lost")]
    Disconnected,

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error leaves the session unusable for further commands.
    ///
    /// Fatal errors abort a batch; everything else is recovered into a step
    /// classification.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Channel(_) | Error::InvalidRequest(_))
    }

    /// Whether the error came from credential negotiation.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Error::AuthenticationFailed(_)
                | Error::AuthTimeout(_)
                | Error::AgentUnavailable(_)
                | Error::KeyLoadFailed { .. }
        )
    }

    /// Whether the error came from establishing the network connection.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::ConnectTimeout { .. } | Error::Disconnected
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
