//! The two halves of a running session and the states it moves through.

pub(crate) mod dispatch;
pub(crate) mod pacer;

use std::time::Duration;

use audiosocket_protocol::encode_hangup;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Roughly thirty years; stands in for deadlines too large to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Lifecycle of a session, published while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Bootstrap exchange. A [`Session`](crate::Session) only exists once it
    /// has succeeded, so a failed bootstrap never reaches `Closed`; it is
    /// reported by the error `dial` or `accept` returns.
    Starting,
    Streaming,
    /// Sending the trailing hangup.
    Draining,
    Closed,
}

/// How a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The outbound source was delivered in full.
    Completed,
    PeerHangup,
    /// The peer closed the connection without a hangup.
    PeerClosed,
    DeadlineElapsed,
    Cancelled,
}

/// Audio counters for one direction.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Traffic {
    pub(crate) frames: u64,
    pub(crate) bytes: u64,
}

impl Traffic {
    pub(crate) fn record(&mut self, len: usize) {
        self.frames += 1;
        self.bytes += len as u64;
    }
}

/// The session's stop conditions: its deadline and its cancellation token.
pub(crate) struct Stop {
    deadline: Instant,
    cancel: CancellationToken,
}

impl Stop {
    pub(crate) fn after(limit: Duration, cancel: CancellationToken) -> Self {
        let now = Instant::now();
        Self {
            deadline: now.checked_add(limit).unwrap_or(now + FAR_FUTURE),
            cancel,
        }
    }

    /// Resolves once the session must stop, reporting why.
    pub(crate) async fn wait(&self) -> Disposition {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Disposition::Cancelled,
            () = sleep_until(self.deadline) => Disposition::DeadlineElapsed,
        }
    }
}

/// Best-effort hangup bounded by `limit`; failures are only logged.
pub(crate) async fn send_hangup<W: AsyncWrite + Unpin>(writer: &mut W, limit: Duration, tag: &str) {
    match timeout(limit, writer.write_all(&encode_hangup())).await {
        Ok(Ok(())) => debug!("[{}] Sent hangup", tag),
        Ok(Err(e)) => warn!("[{}] Failed to send hangup: {}", tag, e),
        Err(_) => warn!("[{}] Timed out sending hangup", tag),
    }
}

pub(crate) async fn shutdown<W: AsyncWrite + Unpin>(writer: &mut W, limit: Duration, tag: &str) {
    match timeout(limit, writer.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("[{}] Shutdown error: {}", tag, e),
        Err(_) => debug!("[{}] Shutdown timed out", tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_wins_over_elapsed_deadline() {
        let cancel = CancellationToken::new();
        let stop = Stop::after(Duration::ZERO, cancel.clone());
        cancel.cancel();
        assert_eq!(stop.wait().await, Disposition::Cancelled);
    }

    #[tokio::test]
    async fn huge_deadline_does_not_overflow() {
        let cancel = CancellationToken::new();
        let stop = Stop::after(Duration::MAX, cancel.clone());
        assert!(stop.deadline > Instant::now() + Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn hangup_bytes() {
        let mut out = Vec::new();
        send_hangup(&mut out, Duration::from_secs(1), "test").await;
        assert_eq!(out, vec![0x00, 0x00, 0x00]);
    }
}
