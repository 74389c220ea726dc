//! Relay timing and sizing defaults.

use std::time::Duration;

use audiosocket_protocol::MAX_PAYLOAD_LEN;

use crate::error::AudioSocketError;

/// Bytes per outbound audio message: 8000Hz * 20ms * 2 bytes.
pub const DEFAULT_FRAME_SIZE: usize = 320;

/// Interval between outbound audio messages.
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(20);

/// Upper bound for establishing a TCP connection to one candidate address.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Upper bound for receiving the identity message on an accepted connection.
pub const DEFAULT_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for the best-effort hangup while draining.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Buffer size for socket reads.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Per-session relay settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum payload bytes per outbound audio message.
    pub frame_size: usize,
    /// Interval between outbound audio messages.
    pub cadence: Duration,
    /// Connect timeout used when the session dials out.
    pub connect_timeout: Duration,
    /// Time allowed for the peer's identity message.
    pub bootstrap_timeout: Duration,
    /// Time allowed for the trailing hangup message.
    pub drain_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            cadence: DEFAULT_CADENCE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            bootstrap_timeout: DEFAULT_BOOTSTRAP_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl RelayConfig {
    /// Checks that frames fit the wire format and timers are non-zero.
    ///
    /// # Errors
    /// Returns [`AudioSocketError::InvalidConfig`] describing the first bad field.
    pub fn validate(&self) -> Result<(), AudioSocketError> {
        if self.frame_size == 0 {
            return Err(AudioSocketError::InvalidConfig("frame_size must be positive"));
        }
        if self.frame_size > MAX_PAYLOAD_LEN {
            return Err(AudioSocketError::InvalidConfig("frame_size exceeds 65535 bytes"));
        }
        if self.cadence.is_zero() {
            return Err(AudioSocketError::InvalidConfig("cadence must be positive"));
        }
        if self.connect_timeout.is_zero() {
            return Err(AudioSocketError::InvalidConfig("connect_timeout must be positive"));
        }
        Ok(())
    }
}
