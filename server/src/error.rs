//! Error types for the AudioSocket server.

use std::path::PathBuf;

use audiosocket_sdk::AudioSocketError;
use thiserror::Error;

/// Errors that can occur in the server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session error: {0}")]
    Session(#[from] AudioSocketError),

    #[error("Failed to read audio file {}: {source}", path.display())]
    AudioFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
