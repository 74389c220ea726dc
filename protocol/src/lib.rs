//! AudioSocket wire protocol.
//!
//! Every message is `[kind: u8][payload_len: u16 BE][payload...]`. This crate
//! holds the message types, encoders and decoders; it performs no network I/O.

pub mod error;
pub mod error_code;
pub mod identity;
mod io;
pub mod kind;
pub mod message;
pub mod stream;

pub use error::ProtocolError;
pub use error_code::ErrorCode;
pub use identity::{Identity, IDENTITY_LEN};
pub use kind::Kind;
pub use message::{
    encode_audio, encode_error, encode_hangup, encode_identity, encode_message, Message,
    HEADER_LEN, MAX_PAYLOAD_LEN,
};
pub use stream::read_message;
