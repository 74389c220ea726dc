//! Configuration constants for the AudioSocket server.

use std::env;
use std::time::Duration;

/// Default TCP port for incoming AudioSocket connections.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Default clip played to callers: raw signed-linear 16-bit 8kHz mono.
pub const DEFAULT_AUDIO_FILE: &str = "test.slin";

/// Default upper bound on a call, in seconds.
pub const DEFAULT_MAX_CALL_SECS: u64 = 120;

/// Returns the listen port from `AUDIOSOCKET_LISTEN_PORT` env var or default.
#[must_use]
pub fn listen_port() -> u16 {
    env::var("AUDIOSOCKET_LISTEN_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_LISTEN_PORT)
}

/// Returns the clip path from `AUDIOSOCKET_AUDIO_FILE` env var or default.
#[must_use]
pub fn audio_file() -> String {
    env::var("AUDIOSOCKET_AUDIO_FILE")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_AUDIO_FILE.to_string())
}

/// Returns the call limit from `AUDIOSOCKET_MAX_CALL_SECS` env var or default.
#[must_use]
pub fn max_call_duration() -> Duration {
    let secs = env::var("AUDIOSOCKET_MAX_CALL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&s: &u64| s > 0)
        .unwrap_or(DEFAULT_MAX_CALL_SECS);
    Duration::from_secs(secs)
}
