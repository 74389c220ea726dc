//! AudioSocket service: accepts calls, reads each caller's identity and plays
//! a shared clip back at real-time pace before hanging up.

pub mod config;
pub mod error;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use audiosocket_protocol::Identity;
use audiosocket_sdk::{Discard, LogHandler, PcmBuffer, RelayConfig, Session, SessionResult};
use dashmap::DashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::error::ServerError;

/// A call currently being served.
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub peer: SocketAddr,
    pub started: Instant,
    cancel: CancellationToken,
}

/// Plays one prerecorded clip to every caller.
#[derive(Clone)]
pub struct Server {
    audio: Arc<[u8]>,
    max_call_duration: Duration,
    relay: RelayConfig,
    calls: Arc<DashMap<Identity, CallInfo>>,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

impl Server {
    /// `audio` is raw signed-linear 16-bit 8kHz mono, shared by all calls.
    pub fn new(audio: impl Into<Arc<[u8]>>) -> Self {
        Server {
            audio: audio.into(),
            max_call_duration: Duration::from_secs(config::DEFAULT_MAX_CALL_SECS),
            relay: RelayConfig::default(),
            calls: Arc::new(DashMap::new()),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_max_call_duration(mut self, limit: Duration) -> Self {
        self.max_call_duration = limit;
        self
    }

    #[must_use]
    pub fn with_relay_config(mut self, relay: RelayConfig) -> Self {
        self.relay = relay;
        self
    }

    /// Number of calls in progress.
    #[must_use]
    pub fn active_calls(&self) -> usize {
        self.calls.len()
    }

    /// Details of the call with `identity`, if it is in progress.
    #[must_use]
    pub fn call(&self, identity: &Identity) -> Option<CallInfo> {
        self.calls.get(identity).map(|entry| entry.value().clone())
    }

    /// Stop accepting connections and end every call in progress.
    ///
    /// Calls drain normally, each sending its trailing hangup before the
    /// serving future returns.
    pub fn shutdown(&self) {
        info!("Shutting down, ending {} call(s)", self.calls.len());
        self.shutdown.cancel();
        for entry in self.calls.iter() {
            entry.value().cancel.cancel();
        }
    }

    /// Bind and serve until [`Server::shutdown`] is called and every call has ended.
    ///
    /// # Errors
    /// Returns [`ServerError::Io`] if the listener cannot be bound.
    pub async fn run(&self, addr: &str) -> Result<(), ServerError> {
        self.relay.validate()?;
        let listener = TcpListener::bind(addr).await?;
        info!("Listening for AudioSocket connections on {}", listener.local_addr()?);
        self.serve(listener).await;
        Ok(())
    }

    /// Bind and serve in the background, returning the bound address.
    ///
    /// # Errors
    /// Returns [`ServerError::Io`] if the listener cannot be bound.
    pub async fn bind(&self, addr: &str) -> Result<SocketAddr, ServerError> {
        self.relay.validate()?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Listening for AudioSocket connections on {}", local_addr);

        let server = self.clone();
        tokio::spawn(async move { server.serve(listener).await });
        Ok(local_addr)
    }

    async fn serve(&self, listener: TcpListener) {
        loop {
            let (socket, peer_addr) = tokio::select! {
                () = self.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };
            debug!("[{}] New connection", peer_addr);

            let server = self.clone();
            self.tasks.spawn(async move {
                if let Err(e) = server.handle_call(socket, peer_addr).await {
                    error!("[{}] Error: {}", peer_addr, e);
                }
            });
        }
        drop(listener);

        self.tasks.close();
        debug!("Accept loop stopped, waiting for {} call(s)", self.tasks.len());
        self.tasks.wait().await;
        debug!("All calls ended");
    }

    async fn handle_call(&self, socket: TcpStream, peer_addr: SocketAddr) -> Result<(), ServerError> {
        if let Err(e) = socket.set_nodelay(true) {
            debug!("[{}] Failed to set TCP_NODELAY: {}", peer_addr, e);
        }

        let session = Session::accept(socket, self.relay.clone())
            .await?
            .with_tag(peer_addr.to_string());
        let identity = session.identity();
        info!("[{}] Processing call {}", peer_addr, identity);

        let call = CallInfo {
            peer: peer_addr,
            started: Instant::now(),
            cancel: session.cancel_token(),
        };
        if let Some(previous) = self.calls.insert(identity, call) {
            warn!(
                "[{}] Call {} is already active from {}",
                peer_addr, identity, previous.peer
            );
        }
        if self.shutdown.is_cancelled() {
            session.cancel_token().cancel();
        }

        let result: SessionResult = session
            .run(
                PcmBuffer::new(Arc::clone(&self.audio)),
                Discard,
                LogHandler::new(peer_addr.to_string()),
                self.max_call_duration,
            )
            .await;

        self.calls.remove_if(&identity, |_, call| call.peer == peer_addr);

        let summary = result?;
        info!(
            "[{}] Call {} ended ({:?}) after {} frames",
            peer_addr, identity, summary.disposition, summary.frames_sent
        );
        Ok(())
    }
}

/// Reads the clip played to callers, trimmed to whole samples.
///
/// # Errors
/// Returns [`ServerError::AudioFile`] if the file cannot be read.
pub fn load_audio(path: &Path) -> Result<Arc<[u8]>, ServerError> {
    let mut data = std::fs::read(path).map_err(|source| ServerError::AudioFile {
        path: path.to_path_buf(),
        source,
    })?;
    if data.len() % 2 != 0 {
        warn!(
            "Audio file {} has an odd length, ignoring the trailing byte",
            path.display()
        );
        data.pop();
    }
    info!("Loaded {} bytes of audio from {}", data.len(), path.display());
    Ok(data.into())
}
