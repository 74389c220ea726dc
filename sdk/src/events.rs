//! Delivery of inbound control messages to the caller.

use std::future::{ready, Future};

use async_channel::Sender;
use audiosocket_protocol::{ErrorCode, Kind};
use tracing::{debug, info, warn};

/// A control message received during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Silence or DTMF; the payload is passed through uninterpreted.
    Signal { kind: Kind, payload: Vec<u8> },
    /// The peer reported an error. The session keeps running.
    Error(ErrorCode),
}

/// Receives inbound signals and error reports.
pub trait SignalHandler: Send {
    fn on_signal(&mut self, kind: Kind, payload: Vec<u8>) -> impl Future<Output = ()> + Send;

    fn on_error(&mut self, code: ErrorCode) -> impl Future<Output = ()> + Send;
}

impl<T: SignalHandler + ?Sized> SignalHandler for &mut T {
    fn on_signal(&mut self, kind: Kind, payload: Vec<u8>) -> impl Future<Output = ()> + Send {
        (**self).on_signal(kind, payload)
    }

    fn on_error(&mut self, code: ErrorCode) -> impl Future<Output = ()> + Send {
        (**self).on_error(code)
    }
}

/// Logs at debug level only.
impl SignalHandler for () {
    fn on_signal(&mut self, kind: Kind, payload: Vec<u8>) -> impl Future<Output = ()> + Send {
        debug!("Ignoring {} signal ({} bytes)", kind, payload.len());
        ready(())
    }

    fn on_error(&mut self, code: ErrorCode) -> impl Future<Output = ()> + Send {
        debug!("Ignoring peer error: {}", code);
        ready(())
    }
}

/// Writes every event to the log, tagged with a call label.
#[derive(Debug, Clone)]
pub struct LogHandler {
    tag: String,
}

impl LogHandler {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl SignalHandler for LogHandler {
    fn on_signal(&mut self, kind: Kind, payload: Vec<u8>) -> impl Future<Output = ()> + Send {
        if kind == Kind::Dtmf {
            info!("[{}] Received DTMF '{}'", self.tag, String::from_utf8_lossy(&payload));
        } else {
            debug!("[{}] Received {} ({} bytes)", self.tag, kind, payload.len());
        }
        ready(())
    }

    fn on_error(&mut self, code: ErrorCode) -> impl Future<Output = ()> + Send {
        warn!("[{}] Peer reported error: {}", self.tag, code);
        ready(())
    }
}

/// Forwards events to a channel. A closed receiver is logged and otherwise ignored.
impl SignalHandler for Sender<SessionEvent> {
    async fn on_signal(&mut self, kind: Kind, payload: Vec<u8>) {
        if self.send(SessionEvent::Signal { kind, payload }).await.is_err() {
            debug!("Event receiver dropped, discarding {} signal", kind);
        }
    }

    async fn on_error(&mut self, code: ErrorCode) {
        if self.send(SessionEvent::Error(code)).await.is_err() {
            debug!("Event receiver dropped, discarding error {}", code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_handler_forwards_in_order() {
        let (mut tx, rx) = async_channel::unbounded::<SessionEvent>();
        tx.on_signal(Kind::Dtmf, b"5".to_vec()).await;
        tx.on_error(ErrorCode::MEMORY).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Signal {
                kind: Kind::Dtmf,
                payload: b"5".to_vec()
            }
        );
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::Error(ErrorCode::MEMORY));
    }

    #[tokio::test]
    async fn closed_channel_is_not_fatal() {
        let (mut tx, rx) = async_channel::unbounded::<SessionEvent>();
        drop(rx);
        tx.on_error(ErrorCode::HANGUP).await;
    }
}
