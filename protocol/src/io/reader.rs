use crate::error::ProtocolError;
use crate::message::HEADER_LEN;

/// Helper for reading a message out of a byte buffer with automatic cursor advancement.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[inline]
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads the `[kind][len_hi][len_lo]` header.
    #[inline]
    pub fn read_header(&mut self) -> Result<(u8, u16), ProtocolError> {
        let header = self
            .data
            .get(self.pos..self.pos + HEADER_LEN)
            .ok_or(ProtocolError::IncompleteHeader {
                got: self.data.len() - self.pos,
            })?;
        self.pos += HEADER_LEN;
        Ok((header[0], u16::from_be_bytes([header[1], header[2]])))
    }

    /// Reads exactly `len` payload bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + len)
            .ok_or(ProtocolError::IncompleteBody {
                expected: len,
                got: self.data.len() - self.pos,
            })?;
        self.pos += len;
        Ok(bytes)
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }
}
