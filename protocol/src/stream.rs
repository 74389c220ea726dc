//! Blocking message reads from any [`std::io::Read`] source.

use std::io::{self, Read};

use crate::error::ProtocolError;
use crate::message::{Message, HEADER_LEN};

/// Reads the next message from `r`.
///
/// Partial reads are retried until the header and the whole payload have
/// arrived; a single `read` call is never assumed to return a full frame.
///
/// # Errors
/// Returns [`ProtocolError::IncompleteHeader`] or [`ProtocolError::IncompleteBody`]
/// if the stream ends early, and [`ProtocolError::Io`] on read failures.
pub fn read_message<R: Read>(r: &mut R) -> Result<Message, ProtocolError> {
    let mut header = [0u8; HEADER_LEN];
    let got = fill(r, &mut header)?;
    if got < HEADER_LEN {
        return Err(ProtocolError::IncompleteHeader { got });
    }

    let len = u16::from_be_bytes([header[1], header[2]]) as usize;
    let mut payload = vec![0u8; len];
    let got = fill(r, &mut payload)?;
    if got < len {
        return Err(ProtocolError::IncompleteBody { expected: len, got });
    }

    Message::new(header[0], payload)
}

/// Reads until `buf` is full or the stream ends, returning the byte count.
fn fill<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize, ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
