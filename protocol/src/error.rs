use std::fmt;
use std::io;

/// Protocol decoding and encoding errors.
#[derive(Debug)]
pub enum ProtocolError {
    /// The stream ended before the 3-byte header was complete.
    IncompleteHeader { got: usize },
    /// The stream ended before the announced payload was complete.
    IncompleteBody { expected: usize, got: usize },
    /// Payload does not fit the 16-bit length field.
    PayloadTooLarge { len: usize },
    /// The underlying reader failed.
    Io(io::Error),
}

impl ProtocolError {
    /// Returns `true` if more bytes could still complete the message.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            ProtocolError::IncompleteHeader { .. } | ProtocolError::IncompleteBody { .. }
        )
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::IncompleteHeader { got } => {
                write!(f, "incomplete header: expected 3 bytes, got {got}")
            }
            ProtocolError::IncompleteBody { expected, got } => {
                write!(f, "incomplete payload: expected {expected} bytes, got {got}")
            }
            ProtocolError::PayloadTooLarge { len } => {
                write!(f, "payload too large: {len} bytes exceeds 65535")
            }
            ProtocolError::Io(e) => write!(f, "read failed: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProtocolError {
    fn from(e: io::Error) -> Self {
        ProtocolError::Io(e)
    }
}
