use crate::error::ProtocolError;
use crate::error_code::ErrorCode;
use crate::identity::{Identity, IDENTITY_LEN};
use crate::io::{Reader, Writer};
use crate::kind::Kind;

/// Size of the `[kind: u8][payload_len: u16 BE]` header.
pub const HEADER_LEN: usize = 3;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// A single framed protocol message.
///
/// Wire format: `[kind: u8][payload_len: u16 BE][payload...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: u8,
    payload: Vec<u8>,
}

impl Message {
    /// Creates a message, rejecting payloads that do not fit the length field.
    ///
    /// # Errors
    /// Returns [`ProtocolError::PayloadTooLarge`] if `payload` exceeds 65535 bytes.
    pub fn new(kind: u8, payload: Vec<u8>) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge { len: payload.len() });
        }
        Ok(Self { kind, payload })
    }

    /// Decode a message from the front of `buf`.
    ///
    /// Returns the decoded message and the number of bytes consumed.
    ///
    /// # Errors
    /// Returns [`ProtocolError::IncompleteHeader`] or [`ProtocolError::IncompleteBody`]
    /// if `buf` does not yet hold a whole message.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), ProtocolError> {
        let mut r = Reader::new(buf);
        let (kind, len) = r.read_header()?;
        let payload = r.read_bytes(len as usize)?.to_vec();
        Ok((Self { kind, payload }, r.position()))
    }

    /// Encode the message to wire format.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_payload_capacity(self.payload.len());
        w.write_header(self.kind, self.payload.len())
            .expect("payload length checked at construction");
        w.write_bytes(&self.payload);
        w.into_vec()
    }

    /// Message type; unknown kind bytes classify as [`Kind::Error`].
    #[must_use]
    pub fn kind(&self) -> Kind {
        Kind::from_u8(self.kind)
    }

    /// The kind byte exactly as it appeared on the wire.
    #[must_use]
    pub fn raw_kind(&self) -> u8 {
        self.kind
    }

    /// Payload length, 0 for header-only messages.
    #[must_use]
    pub fn content_length(&self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let len = self.payload.len() as u16;
        len
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// The error code of an error message.
    ///
    /// `None` for any other kind; [`ErrorCode::UNKNOWN`] when the code byte is missing.
    #[must_use]
    pub fn error_code(&self) -> Option<ErrorCode> {
        if self.kind() != Kind::Error {
            return None;
        }
        Some(
            self.payload
                .first()
                .map_or(ErrorCode::UNKNOWN, |&b| ErrorCode(b)),
        )
    }

    /// The call identifier, if this is a well-formed identity message.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        if self.kind() != Kind::Identity {
            return None;
        }
        Identity::from_slice(&self.payload)
    }
}

/// Encode a hangup message: `[0x00, 0x00, 0x00]`.
#[must_use]
pub fn encode_hangup() -> Vec<u8> {
    vec![Kind::Hangup.as_u8(), 0x00, 0x00]
}

/// Encode an identity message.
/// Format: `[0x01][0x00 0x10][id: 16 bytes]`
#[must_use]
pub fn encode_identity(id: &Identity) -> Vec<u8> {
    let mut w = Writer::with_payload_capacity(IDENTITY_LEN);
    w.write_header(Kind::Identity.as_u8(), IDENTITY_LEN)
        .expect("identity fits the length field");
    w.write_bytes(id.as_bytes());
    w.into_vec()
}

/// Encode an audio message carrying raw signed-linear samples.
/// Format: `[0x10][len: u16 BE][samples...]`
///
/// # Errors
/// Returns [`ProtocolError::PayloadTooLarge`] if `samples` exceeds 65535 bytes.
pub fn encode_audio(samples: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    encode_message(Kind::Audio, samples)
}

/// Encode an error message carrying a single code byte.
/// Format: `[0xff][0x00 0x01][code]`
#[must_use]
pub fn encode_error(code: ErrorCode) -> Vec<u8> {
    vec![Kind::Error.as_u8(), 0x00, 0x01, code.as_u8()]
}

/// Encode a message of any kind.
///
/// # Errors
/// Returns [`ProtocolError::PayloadTooLarge`] if `payload` exceeds 65535 bytes.
pub fn encode_message(kind: Kind, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut w = Writer::with_payload_capacity(payload.len().min(MAX_PAYLOAD_LEN));
    w.write_header(kind.as_u8(), payload.len())?;
    w.write_bytes(payload);
    Ok(w.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential_identity() -> Identity {
        let mut bytes = [0u8; 16];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = u8::try_from(i).unwrap();
        }
        Identity::from_bytes(bytes)
    }

    #[test]
    fn decode_hangup() {
        let (msg, size) = Message::decode(&[0x00, 0x00, 0x00]).unwrap();
        assert_eq!(size, 3);
        assert_eq!(msg.kind(), Kind::Hangup);
        assert_eq!(msg.content_length(), 0);
        assert!(msg.payload().is_empty());
    }

    #[test]
    fn encode_hangup_is_three_zero_bytes() {
        assert_eq!(encode_hangup(), vec![0x00, 0x00, 0x00]);
    }

    #[test]
    fn identity_encoding_and_decoding() {
        let id = sequential_identity();
        let encoded = encode_identity(&id);

        assert_eq!(&encoded[..3], &[0x01, 0x00, 0x10]);
        assert_eq!(&encoded[3..], &(0u8..16).collect::<Vec<_>>()[..]);

        let (msg, size) = Message::decode(&encoded).unwrap();
        assert_eq!(size, 19);
        assert_eq!(msg.kind(), Kind::Identity);
        assert_eq!(msg.identity(), Some(id));
    }

    #[test]
    fn audio_roundtrip() {
        let samples: Vec<u8> = (0..320u32).map(|i| (i % 251) as u8).collect();
        let encoded = encode_audio(&samples).unwrap();
        assert_eq!(&encoded[..3], &[0x10, 0x01, 0x40]);

        let (msg, size) = Message::decode(&encoded).unwrap();
        assert_eq!(size, encoded.len());
        assert_eq!(msg.kind(), Kind::Audio);
        assert_eq!(msg.content_length(), 320);
        assert_eq!(msg.payload(), &samples[..]);
        assert_eq!(msg.encode(), encoded);
    }

    #[test]
    fn max_payload_is_accepted() {
        let samples = vec![0u8; MAX_PAYLOAD_LEN];
        let encoded = encode_audio(&samples).unwrap();
        assert_eq!(&encoded[..3], &[0x10, 0xff, 0xff]);
    }

    #[test]
    fn oversized_audio_is_rejected() {
        let samples = vec![0u8; MAX_PAYLOAD_LEN + 1];
        match encode_audio(&samples) {
            Err(ProtocolError::PayloadTooLarge { len }) => assert_eq!(len, 65536),
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
        assert!(Message::new(Kind::Audio.as_u8(), samples).is_err());
    }

    #[test]
    fn error_code_extraction() {
        let (msg, _) = Message::decode(&encode_error(ErrorCode::FRAME_FORWARDING)).unwrap();
        assert_eq!(msg.kind(), Kind::Error);
        assert_eq!(msg.error_code(), Some(ErrorCode::FRAME_FORWARDING));
    }

    #[test]
    fn error_without_code_byte_is_unknown() {
        let (msg, _) = Message::decode(&[0xff, 0x00, 0x00]).unwrap();
        assert_eq!(msg.error_code(), Some(ErrorCode::UNKNOWN));
    }

    #[test]
    fn error_code_is_undefined_for_other_kinds() {
        let (msg, _) = Message::decode(&[0x10, 0x00, 0x02, 0x01, 0x02]).unwrap();
        assert_eq!(msg.error_code(), None);
    }

    #[test]
    fn unknown_kind_decodes_as_error() {
        let (msg, size) = Message::decode(&[0x7a, 0x00, 0x01, 0x09]).unwrap();
        assert_eq!(size, 4);
        assert_eq!(msg.kind(), Kind::Error);
        assert_eq!(msg.raw_kind(), 0x7a);
        assert_eq!(msg.payload(), &[0x09]);
    }

    #[test]
    fn short_header_is_incomplete() {
        for prefix in [&[][..], &[0x10][..], &[0x10, 0x00][..]] {
            match Message::decode(prefix) {
                Err(ProtocolError::IncompleteHeader { got }) => assert_eq!(got, prefix.len()),
                other => panic!("expected IncompleteHeader, got {other:?}"),
            }
        }
    }

    #[test]
    fn short_body_is_incomplete() {
        match Message::decode(&[0x10, 0x00, 0x04, 0xaa, 0xbb]) {
            Err(ProtocolError::IncompleteBody { expected, got }) => {
                assert_eq!(expected, 4);
                assert_eq!(got, 2);
            }
            other => panic!("expected IncompleteBody, got {other:?}"),
        }
    }

    #[test]
    fn decode_leaves_trailing_bytes() {
        let mut buf = encode_audio(&[1, 2, 3, 4]).unwrap();
        buf.extend_from_slice(&encode_hangup());

        let (first, size) = Message::decode(&buf).unwrap();
        assert_eq!(first.kind(), Kind::Audio);
        assert_eq!(size, 7);

        let (second, size) = Message::decode(&buf[size..]).unwrap();
        assert_eq!(second.kind(), Kind::Hangup);
        assert_eq!(size, 3);
    }

    #[test]
    fn signal_message_encoding() {
        let encoded = encode_message(Kind::Dtmf, b"5").unwrap();
        assert_eq!(encoded, vec![0x03, 0x00, 0x01, b'5']);
    }
}
