use crate::error::ProtocolError;
use crate::message::{HEADER_LEN, MAX_PAYLOAD_LEN};

/// Helper for building wire frames.
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a writer sized for a frame carrying `payload_len` bytes.
    pub fn with_payload_capacity(payload_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(HEADER_LEN + payload_len),
        }
    }

    /// Writes the header; fails before anything is written if the payload is too large.
    pub fn write_header(&mut self, kind: u8, payload_len: usize) -> Result<(), ProtocolError> {
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge { len: payload_len });
        }
        #[allow(clippy::cast_possible_truncation)]
        let len = payload_len as u16;
        self.buf.push(kind);
        self.buf.extend_from_slice(&len.to_be_bytes());
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}
