//! Error types for AudioSocket sessions.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use audiosocket_protocol::{Kind, ProtocolError};
use thiserror::Error;

/// Errors that end a session or prevent one from starting.
#[derive(Error, Debug)]
pub enum AudioSocketError {
    #[error("codec error: {0}")]
    Codec(#[from] ProtocolError),

    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        endpoint: String,
        reason: &'static str,
    },

    #[error("failed to resolve '{endpoint}': {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: SocketAddr, timeout: Duration },

    #[error("connection to {addr} refused")]
    ConnectRefused { addr: SocketAddr },

    #[error("connection to {addr} failed: {source}")]
    ConnectIo {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to '{endpoint}' after {attempts} attempt(s)")]
    ConnectFailed {
        endpoint: String,
        attempts: usize,
        #[source]
        last: Option<Box<AudioSocketError>>,
    },

    #[error("bootstrap failed: {0}")]
    BootstrapFailed(#[source] io::Error),

    #[error("protocol violation: first message must be a 16-byte identity, got {got} (0x{raw:02x})")]
    ProtocolViolation { got: Kind, raw: u8 },

    #[error("protocol error: {reason}")]
    ProtocolError { reason: String },

    #[error("write failed: {0}")]
    WriteFailure(#[source] io::Error),

    #[error("read failed: {0}")]
    ReadFailure(#[source] io::Error),

    #[error("audio source failed: {0}")]
    SourceFailure(#[source] io::Error),

    #[error("audio sink failed: {0}")]
    SinkFailure(#[source] io::Error),

    #[error("invalid relay configuration: {0}")]
    InvalidConfig(&'static str),
}

impl AudioSocketError {
    /// Returns `true` for connection establishment failures.
    #[must_use]
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            AudioSocketError::InvalidEndpoint { .. }
                | AudioSocketError::Resolve { .. }
                | AudioSocketError::ConnectTimeout { .. }
                | AudioSocketError::ConnectRefused { .. }
                | AudioSocketError::ConnectIo { .. }
                | AudioSocketError::ConnectFailed { .. }
        )
    }
}
