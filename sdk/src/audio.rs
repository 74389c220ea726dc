//! Where outbound audio comes from and where inbound audio goes.

use std::future::{ready, Future};
use std::io;
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use tracing::warn;

/// Supplies outbound PCM for the pacer.
pub trait AudioSource: Send {
    /// Next chunk of at most `max_len` bytes, or `None` when the source is exhausted.
    fn next_chunk(&mut self, max_len: usize) -> impl Future<Output = io::Result<Option<Vec<u8>>>> + Send;
}

/// Consumes inbound audio payloads in arrival order.
pub trait AudioSink: Send {
    fn write_audio(&mut self, samples: Vec<u8>) -> impl Future<Output = io::Result<()>> + Send;
}

impl<T: AudioSink + ?Sized> AudioSink for &mut T {
    fn write_audio(&mut self, samples: Vec<u8>) -> impl Future<Output = io::Result<()>> + Send {
        (**self).write_audio(samples)
    }
}

impl<T: AudioSource + ?Sized> AudioSource for &mut T {
    fn next_chunk(&mut self, max_len: usize) -> impl Future<Output = io::Result<Option<Vec<u8>>>> + Send {
        (**self).next_chunk(max_len)
    }
}

/// A prerecorded clip shared between sessions.
///
/// Each session keeps only its own read offset; the samples are never copied
/// beyond the frame in flight.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    data: Arc<[u8]>,
    offset: usize,
}

impl PcmBuffer {
    /// Wraps 16-bit PCM samples. A trailing odd byte is not a whole sample and is ignored.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        let data: Arc<[u8]> = data.into();
        if data.len() % 2 != 0 {
            warn!("Clip of {} bytes has an odd length, ignoring the trailing byte", data.len());
        }
        Self { data, offset: 0 }
    }

    /// Bytes not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.playable_len() - self.offset
    }

    fn playable_len(&self) -> usize {
        self.data.len() & !1
    }
}

impl AudioSource for PcmBuffer {
    fn next_chunk(&mut self, max_len: usize) -> impl Future<Output = io::Result<Option<Vec<u8>>>> + Send {
        let end = self.playable_len().min(self.offset + max_len);
        let chunk = if end > self.offset {
            let chunk = self.data[self.offset..end].to_vec();
            self.offset = end;
            Some(chunk)
        } else {
            None
        };
        ready(Ok(chunk))
    }
}

/// Endless zeroed frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl AudioSource for Silence {
    fn next_chunk(&mut self, max_len: usize) -> impl Future<Output = io::Result<Option<Vec<u8>>>> + Send {
        ready(Ok(Some(vec![0u8; max_len & !1])))
    }
}

/// Live audio fed through a channel; ends when every sender is dropped.
///
/// Frames longer than the requested size are split across ticks.
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
        }
    }
}

impl AudioSource for ChannelSource {
    async fn next_chunk(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        while self.pending.is_empty() {
            match self.rx.recv().await {
                Ok(frame) => self.pending = frame,
                Err(_) => return Ok(None),
            }
        }
        Ok(Some(split_front(&mut self.pending, max_len)))
    }
}

/// Removes and returns up to `max_len` bytes from the front of `buf`.
pub(crate) fn split_front(buf: &mut Vec<u8>, max_len: usize) -> Vec<u8> {
    if buf.len() <= max_len {
        std::mem::take(buf)
    } else {
        let rest = buf.split_off(max_len);
        std::mem::replace(buf, rest)
    }
}

impl AudioSink for Vec<u8> {
    fn write_audio(&mut self, samples: Vec<u8>) -> impl Future<Output = io::Result<()>> + Send {
        self.extend_from_slice(&samples);
        ready(Ok(()))
    }
}

/// Drops inbound audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl AudioSink for Discard {
    fn write_audio(&mut self, _samples: Vec<u8>) -> impl Future<Output = io::Result<()>> + Send {
        ready(Ok(()))
    }
}

impl AudioSink for Sender<Vec<u8>> {
    async fn write_audio(&mut self, samples: Vec<u8>) -> io::Result<()> {
        self.send(samples)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "audio receiver dropped"))
    }
}
