//! Bridges a telephony engine's call channel to an AudioSocket service.
//!
//! The engine is reached only through [`HostChannel`]; everything else is the
//! regular dial-side session.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use audiosocket_protocol::Identity;
use tracing::{debug, info};

use crate::audio::{split_front, AudioSink, AudioSource};
use crate::config::RelayConfig;
use crate::connector;
use crate::error::AudioSocketError;
use crate::events::SignalHandler;
use crate::session::{Session, SessionResult};

/// Whether the host call leg is still connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Up,
    Down,
}

/// A frame read from the host channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostFrame {
    /// Signed linear 16-bit 8kHz mono samples.
    Voice(Vec<u8>),
    /// Anything that is not audio: control, text, video.
    Other,
}

/// Capabilities the host engine provides for one call channel.
pub trait HostChannel: Send + Sync + 'static {
    /// Waits for the next frame from the caller's side.
    fn read_frame(&self) -> impl Future<Output = io::Result<HostFrame>> + Send;

    /// Plays samples towards the caller.
    fn write_frame(&self, samples: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    fn state(&self) -> ChannelState;
}

/// Voice read from the host channel, for outbound pacing.
///
/// Non-voice frames are skipped; the stream ends once the channel is no longer up.
pub struct HostSource<C> {
    host: Arc<C>,
    pending: Vec<u8>,
}

impl<C: HostChannel> HostSource<C> {
    pub fn new(host: Arc<C>) -> Self {
        Self {
            host,
            pending: Vec::new(),
        }
    }
}

impl<C: HostChannel> AudioSource for HostSource<C> {
    async fn next_chunk(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        while self.pending.is_empty() {
            if self.host.state() != ChannelState::Up {
                debug!("Host channel is down, ending outbound audio");
                return Ok(None);
            }
            match self.host.read_frame().await? {
                HostFrame::Voice(samples) => self.pending = samples,
                HostFrame::Other => {}
            }
        }
        Ok(Some(split_front(&mut self.pending, max_len)))
    }
}

/// Plays inbound audio on the host channel.
pub struct HostSink<C> {
    host: Arc<C>,
}

impl<C: HostChannel> HostSink<C> {
    pub fn new(host: Arc<C>) -> Self {
        Self { host }
    }
}

impl<C: HostChannel> AudioSink for HostSink<C> {
    async fn write_audio(&mut self, samples: Vec<u8>) -> io::Result<()> {
        self.host.write_frame(&samples).await
    }
}

/// Connect the host call to the service at `endpoint` and relay until either side ends.
///
/// The channel must be up before anything is dialed.
///
/// # Errors
/// Connection errors from [`connector::connect`], then any error from
/// [`Session::dial`] or [`Session::run`]. A channel that is not up yields
/// [`AudioSocketError::SourceFailure`].
pub async fn bridge<C, H>(
    host: Arc<C>,
    endpoint: &str,
    identity: Identity,
    config: RelayConfig,
    handler: H,
    deadline: Duration,
) -> SessionResult
where
    C: HostChannel,
    H: SignalHandler,
{
    if host.state() != ChannelState::Up {
        return Err(AudioSocketError::SourceFailure(io::Error::new(
            io::ErrorKind::NotConnected,
            "host channel is not up",
        )));
    }

    config.validate()?;
    let stream = connector::connect(endpoint, config.connect_timeout).await?;
    info!("[{}] Bridging host channel to {}", identity, endpoint);

    Session::dial(stream, identity, config)
        .await?
        .run(
            HostSource::new(Arc::clone(&host)),
            HostSink::new(host),
            handler,
            deadline,
        )
        .await
}
