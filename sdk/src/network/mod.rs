pub(crate) mod message_reader;

pub use message_reader::MessageReader;
