use audiosocket_protocol::{Message, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{trace, warn};

use crate::config::READ_BUFFER_SIZE;
use crate::error::AudioSocketError;

/// Reassembles messages from an async byte stream.
///
/// Bytes are accumulated across reads so a message split over any number of
/// TCP segments decodes the same as one delivered whole. `next_message` is
/// cancel safe: dropping it mid-read loses no buffered data.
pub struct MessageReader<R> {
    reader: R,
    read_buf: Box<[u8]>,
    // Buffer to accumulate partial messages across reads
    accumulator: Vec<u8>,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            read_buf: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
            accumulator: Vec::new(),
            bytes_read: 0,
        }
    }

    /// Returns the next complete message, or `None` once the stream has ended.
    ///
    /// A message cut short by end of stream is dropped with a warning and
    /// reported as the end of the stream.
    ///
    /// # Errors
    /// [`AudioSocketError::ReadFailure`] if the underlying read fails.
    pub async fn next_message(&mut self) -> Result<Option<Message>, AudioSocketError> {
        loop {
            match Message::decode(&self.accumulator) {
                Ok((message, size)) => {
                    self.accumulator.drain(..size);
                    trace!(
                        "Decoded message kind 0x{:02x}, {} byte payload",
                        message.raw_kind(),
                        message.content_length()
                    );
                    return Ok(Some(message));
                }
                Err(e) if e.is_incomplete() => {
                    // Wait for more data
                }
                Err(e) => return Err(e.into()),
            }

            let n = self
                .reader
                .read(&mut self.read_buf)
                .await
                .map_err(AudioSocketError::ReadFailure)?;

            if n == 0 {
                if !self.accumulator.is_empty() {
                    warn!(
                        "Stream ended inside a message, dropping {} buffered byte(s): {}",
                        self.accumulator.len(),
                        Message::decode(&self.accumulator)
                            .err()
                            .unwrap_or(ProtocolError::IncompleteHeader { got: 0 })
                    );
                }
                return Ok(None);
            }

            self.bytes_read += n as u64;
            self.accumulator.extend_from_slice(&self.read_buf[..n]);
        }
    }

    /// Bytes received but not yet consumed as a complete message.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.accumulator.len()
    }

    /// Total bytes read from the stream.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}
