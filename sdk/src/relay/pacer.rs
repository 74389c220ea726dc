use std::io;
use std::time::Duration;

use audiosocket_protocol::encode_audio;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{Disposition, Stop, Traffic};
use crate::audio::AudioSource;
use crate::error::AudioSocketError;

/// Why outbound pacing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PaceOutcome {
    pub(crate) disposition: Disposition,
    /// `false` when a frame was cut short, leaving the stream mid-message.
    pub(crate) aligned: bool,
}

impl PaceOutcome {
    fn aligned(disposition: Disposition) -> Self {
        Self {
            disposition,
            aligned: true,
        }
    }
}

/// Sends one audio message per tick until the source runs dry or `stop` fires.
///
/// The first message goes out one cadence after the call. A late timer
/// catches up with back-to-back ticks so the long-run rate stays fixed.
pub(crate) async fn pace<W, A>(
    writer: &mut W,
    source: &mut A,
    frame_size: usize,
    cadence: Duration,
    stop: &Stop,
    traffic: &mut Traffic,
) -> Result<PaceOutcome, AudioSocketError>
where
    W: AsyncWrite + Unpin,
    A: AudioSource,
{
    let mut ticker = interval_at(Instant::now() + cadence, cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        let chunk = tokio::select! {
            biased;
            reason = stop.wait() => return Ok(PaceOutcome::aligned(reason)),
            chunk = source.next_chunk(frame_size) => chunk.map_err(AudioSocketError::SourceFailure)?,
        };
        let Some(chunk) = chunk else {
            return Ok(PaceOutcome::aligned(Disposition::Completed));
        };

        tokio::select! {
            biased;
            reason = stop.wait() => return Ok(PaceOutcome::aligned(reason)),
            _ = ticker.tick() => {}
        }
        if chunk.is_empty() {
            continue;
        }

        let frame = encode_audio(&chunk)?;
        let mut written = 0;
        while written < frame.len() {
            // A pending write has written nothing, so `written` is exact.
            tokio::select! {
                biased;
                reason = stop.wait() => {
                    return Ok(PaceOutcome {
                        disposition: reason,
                        aligned: written == 0,
                    });
                }
                n = writer.write(&frame[written..]) => {
                    match n.map_err(AudioSocketError::WriteFailure)? {
                        0 => return Err(AudioSocketError::WriteFailure(io::ErrorKind::WriteZero.into())),
                        n => written += n,
                    }
                }
            }
        }
        traffic.record(chunk.len());
    }
}
