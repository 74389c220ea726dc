//! Session bootstrap and the relay loop for one call.

use std::io;
use std::time::Duration;

use audiosocket_protocol::{encode_identity, Identity};
use tokio::io::{split, AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioSink, AudioSource};
use crate::config::RelayConfig;
use crate::error::AudioSocketError;
use crate::events::SignalHandler;
use crate::network::MessageReader;
use crate::relay::{self, dispatch, pacer, Disposition, SessionState, Stop, Traffic};

/// Outcome of a session: how it ended, or the error that ended it.
pub type SessionResult = Result<SessionSummary, AudioSocketError>;

/// Final report of a session that ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub identity: Identity,
    pub disposition: Disposition,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
}

/// One call's relay state over one connection.
///
/// Obtained from [`Session::dial`] or [`Session::accept`], then consumed by
/// [`Session::run`], which returns the result exactly once.
pub struct Session<S> {
    identity: Identity,
    tag: String,
    reader: MessageReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    config: RelayConfig,
    cancel: CancellationToken,
    state: watch::Sender<SessionState>,
}

enum Ending {
    Outbound(Result<pacer::PaceOutcome, AudioSocketError>),
    Inbound(Result<Disposition, AudioSocketError>),
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    /// Dial side: announce `identity` before anything else is sent.
    ///
    /// # Errors
    /// [`AudioSocketError::InvalidConfig`] or [`AudioSocketError::BootstrapFailed`].
    pub async fn dial(conn: S, identity: Identity, config: RelayConfig) -> Result<Self, AudioSocketError> {
        config.validate()?;
        let (read, mut write) = split(conn);

        write
            .write_all(&encode_identity(&identity))
            .await
            .map_err(AudioSocketError::BootstrapFailed)?;
        debug!("[{}] Identity sent", identity);

        Ok(Self::new(identity, MessageReader::new(read), write, config))
    }

    /// Accept side: the first message must be the caller's identity.
    ///
    /// Anything else shuts the connection down.
    ///
    /// # Errors
    /// [`AudioSocketError::ProtocolViolation`] if the first message is not a
    /// 16-byte identity, [`AudioSocketError::BootstrapFailed`] if the stream
    /// ends, fails or stays silent past `bootstrap_timeout`.
    pub async fn accept(conn: S, config: RelayConfig) -> Result<Self, AudioSocketError> {
        config.validate()?;
        let (read, mut write) = split(conn);
        let mut reader = MessageReader::new(read);

        let first = match tokio::time::timeout(config.bootstrap_timeout, reader.next_message()).await {
            Err(_) => Err(AudioSocketError::BootstrapFailed(io::Error::new(
                io::ErrorKind::TimedOut,
                "no identity message before bootstrap timeout",
            ))),
            Ok(Err(AudioSocketError::ReadFailure(e))) => Err(AudioSocketError::BootstrapFailed(e)),
            Ok(Err(e)) => Err(e),
            Ok(Ok(None)) => Err(AudioSocketError::BootstrapFailed(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before identity message",
            ))),
            Ok(Ok(Some(message))) => message.identity().ok_or(AudioSocketError::ProtocolViolation {
                got: message.kind(),
                raw: message.raw_kind(),
            }),
        };

        match first {
            Ok(identity) => {
                debug!("[{}] Identity received", identity);
                Ok(Self::new(identity, reader, write, config))
            }
            Err(e) => {
                warn!("Rejecting connection: {}", e);
                relay::shutdown(&mut write, config.drain_timeout, "bootstrap").await;
                Err(e)
            }
        }
    }

    fn new(
        identity: Identity,
        reader: MessageReader<ReadHalf<S>>,
        writer: WriteHalf<S>,
        config: RelayConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Starting);
        Self {
            identity,
            tag: identity.to_string(),
            reader,
            writer,
            config,
            cancel: CancellationToken::new(),
            state,
        }
    }

    /// Replace the label prefixed to this session's log lines (the call identity by default).
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Stop the session early from another task by cancelling this token.
    ///
    /// Cancellation drains the same way an elapsed deadline does.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Watch the session move through its states.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Relay until the source is exhausted, the peer ends the call, `deadline`
    /// elapses or the session is cancelled.
    ///
    /// Outbound audio is paced from `source`; inbound audio goes to `sink` and
    /// control messages to `handler`.
    ///
    /// # Errors
    /// Any transport, protocol, source or sink failure ends the session with that error.
    pub async fn run<A, K, H>(self, mut source: A, mut sink: K, mut handler: H, deadline: Duration) -> SessionResult
    where
        A: AudioSource,
        K: AudioSink,
        H: SignalHandler,
    {
        let Self {
            identity,
            tag,
            mut reader,
            mut writer,
            config,
            cancel,
            state,
        } = self;

        state.send_replace(SessionState::Streaming);
        info!("[{}] Streaming (deadline {:?})", tag, deadline);

        let stop = Stop::after(deadline, cancel);
        let mut sent = Traffic::default();
        let mut received = Traffic::default();

        let ending = {
            let outbound = pacer::pace(
                &mut writer,
                &mut source,
                config.frame_size,
                config.cadence,
                &stop,
                &mut sent,
            );
            let inbound = dispatch::dispatch(&mut reader, &mut sink, &mut handler, &tag, &mut received);

            tokio::select! {
                result = outbound => Ending::Outbound(result),
                result = inbound => Ending::Inbound(result),
            }
        };

        let result = match ending {
            Ending::Outbound(Ok(outcome)) => {
                state.send_replace(SessionState::Draining);
                debug!("[{}] Draining after {:?}", tag, outcome.disposition);
                if outcome.aligned {
                    relay::send_hangup(&mut writer, config.drain_timeout, &tag).await;
                } else {
                    warn!("[{}] Frame cut short, skipping hangup", tag);
                }
                Ok(outcome.disposition)
            }
            Ending::Inbound(Ok(disposition)) => Ok(disposition),
            Ending::Outbound(Err(e)) | Ending::Inbound(Err(e)) => Err(e),
        };

        relay::shutdown(&mut writer, config.drain_timeout, &tag).await;
        state.send_replace(SessionState::Closed);

        match result {
            Ok(disposition) => {
                info!(
                    "[{}] Session closed: {:?}, sent {} frames ({} bytes), received {} frames ({} bytes)",
                    tag, disposition, sent.frames, sent.bytes, received.frames, received.bytes
                );
                Ok(SessionSummary {
                    identity,
                    disposition,
                    frames_sent: sent.frames,
                    bytes_sent: sent.bytes,
                    frames_received: received.frames,
                    bytes_received: received.bytes,
                })
            }
            Err(e) => {
                error!("[{}] Session failed: {}", tag, e);
                Err(e)
            }
        }
    }
}

/// Dial `conn` with the default relay settings and run the session.
///
/// # Errors
/// See [`Session::dial`] and [`Session::run`].
pub async fn run_session<S, A, K, H>(
    conn: S,
    identity: Identity,
    source: A,
    sink: K,
    handler: H,
    deadline: Duration,
) -> SessionResult
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
    A: AudioSource,
    K: AudioSink,
    H: SignalHandler,
{
    Session::dial(conn, identity, RelayConfig::default())
        .await?
        .run(source, sink, handler, deadline)
        .await
}
