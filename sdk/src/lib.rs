//! AudioSocket sessions over tokio.
//!
//! [`connect`] reaches a service, [`Session`] performs the identity bootstrap
//! on either side and then relays paced outbound audio while dispatching
//! inbound messages, until the source runs dry, the peer hangs up, the
//! deadline elapses or the session is cancelled.

pub mod audio;
pub mod config;
pub mod connector;
pub mod error;
pub mod events;
pub mod host;
pub mod network;
mod relay;
pub mod session;

pub use audio::{AudioSink, AudioSource, ChannelSource, Discard, PcmBuffer, Silence};
pub use config::RelayConfig;
pub use connector::connect;
pub use error::AudioSocketError;
pub use events::{LogHandler, SessionEvent, SignalHandler};
pub use host::{bridge, ChannelState, HostChannel, HostFrame, HostSink, HostSource};
pub use network::MessageReader;
pub use relay::{Disposition, SessionState};
pub use session::{run_session, Session, SessionResult, SessionSummary};

pub use audiosocket_protocol as protocol;
pub use tokio_util::sync::CancellationToken;
