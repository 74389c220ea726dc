use audiosocket_protocol::{ErrorCode, Kind};
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use super::{Disposition, Traffic};
use crate::audio::AudioSink;
use crate::error::AudioSocketError;
use crate::events::SignalHandler;
use crate::network::MessageReader;

/// Routes inbound messages until the peer hangs up or goes away.
pub(crate) async fn dispatch<R, K, H>(
    reader: &mut MessageReader<R>,
    sink: &mut K,
    handler: &mut H,
    tag: &str,
    traffic: &mut Traffic,
) -> Result<Disposition, AudioSocketError>
where
    R: AsyncRead + Unpin,
    K: AudioSink,
    H: SignalHandler,
{
    loop {
        let Some(message) = reader.next_message().await? else {
            info!("[{}] Peer closed the connection", tag);
            return Ok(Disposition::PeerClosed);
        };

        match message.kind() {
            Kind::Hangup => {
                info!("[{}] Peer hung up", tag);
                return Ok(Disposition::PeerHangup);
            }
            Kind::Audio => {
                let len = message.payload().len();
                if len % 2 != 0 {
                    return Err(AudioSocketError::ProtocolError {
                        reason: format!("audio payload of {len} bytes is not whole 16-bit samples"),
                    });
                }
                traffic.record(len);
                sink.write_audio(message.into_payload())
                    .await
                    .map_err(AudioSocketError::SinkFailure)?;
            }
            kind @ (Kind::Silence | Kind::Dtmf) => {
                handler.on_signal(kind, message.into_payload()).await;
            }
            Kind::Error => {
                if !Kind::is_known(message.raw_kind()) {
                    warn!(
                        "[{}] Unknown message kind 0x{:02x}, handling as error",
                        tag,
                        message.raw_kind()
                    );
                }
                let code = message.error_code().unwrap_or(ErrorCode::UNKNOWN);
                debug!("[{}] Peer error: {}", tag, code);
                handler.on_error(code).await;
            }
            Kind::Identity => {
                return Err(AudioSocketError::ProtocolError {
                    reason: "identity message received after bootstrap".to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SessionEvent;
    use audiosocket_protocol::{
        encode_audio, encode_error, encode_hangup, encode_identity, encode_message, Identity,
    };

    async fn run(wire: &[u8]) -> (Result<Disposition, AudioSocketError>, Vec<u8>, Vec<SessionEvent>, Traffic) {
        let mut reader = MessageReader::new(wire);
        let mut sink = Vec::<u8>::new();
        let (mut tx, rx) = async_channel::unbounded::<SessionEvent>();
        let mut traffic = Traffic::default();
        let result = dispatch(&mut reader, &mut sink, &mut tx, "test", &mut traffic).await;
        drop(tx);
        let mut events = Vec::new();
        while let Ok(event) = rx.recv().await {
            events.push(event);
        }
        (result, sink, events, traffic)
    }

    #[tokio::test]
    async fn routes_each_kind() {
        let mut wire = encode_message(Kind::Dtmf, b"7").unwrap();
        wire.extend_from_slice(&encode_audio(&[1, 2, 3, 4]).unwrap());
        wire.extend_from_slice(&encode_error(ErrorCode::FRAME_FORWARDING));
        wire.extend_from_slice(&encode_message(Kind::Silence, &[]).unwrap());
        wire.extend_from_slice(&encode_audio(&[5, 6]).unwrap());
        wire.extend_from_slice(&encode_hangup());
        wire.extend_from_slice(&encode_audio(&[9, 9]).unwrap());

        let (result, sink, events, traffic) = run(&wire).await;

        assert_eq!(result.unwrap(), Disposition::PeerHangup);
        assert_eq!(sink, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(traffic.frames, 2);
        assert_eq!(traffic.bytes, 6);
        assert_eq!(
            events,
            vec![
                SessionEvent::Signal {
                    kind: Kind::Dtmf,
                    payload: b"7".to_vec()
                },
                SessionEvent::Error(ErrorCode::FRAME_FORWARDING),
                SessionEvent::Signal {
                    kind: Kind::Silence,
                    payload: Vec::new()
                },
            ]
        );
    }

    #[tokio::test]
    async fn end_of_stream_is_peer_closed() {
        let wire = encode_audio(&[0, 0]).unwrap();
        let (result, sink, _, _) = run(&wire).await;
        assert_eq!(result.unwrap(), Disposition::PeerClosed);
        assert_eq!(sink, vec![0, 0]);
    }

    #[tokio::test]
    async fn unknown_kind_and_empty_error_reach_error_handler() {
        let mut wire = vec![0x7a, 0x00, 0x01, 0x04];
        wire.extend_from_slice(&[0xff, 0x00, 0x00]);

        let (result, _, events, _) = run(&wire).await;

        assert_eq!(result.unwrap(), Disposition::PeerClosed);
        assert_eq!(
            events,
            vec![
                SessionEvent::Error(ErrorCode::MEMORY),
                SessionEvent::Error(ErrorCode::UNKNOWN),
            ]
        );
    }

    #[tokio::test]
    async fn second_identity_is_a_protocol_error() {
        let wire = encode_identity(&Identity::random());
        let (result, _, _, _) = run(&wire).await;
        assert!(matches!(result, Err(AudioSocketError::ProtocolError { .. })));
    }

    #[tokio::test]
    async fn odd_audio_is_a_protocol_error() {
        let wire = encode_audio(&[1, 2, 3]).unwrap();
        let (result, sink, _, _) = run(&wire).await;
        assert!(matches!(result, Err(AudioSocketError::ProtocolError { .. })));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn sink_failure_ends_dispatch() {
        let wire = encode_audio(&[1, 2]).unwrap();
        let mut reader = MessageReader::new(&wire[..]);
        let (mut sink, rx) = async_channel::unbounded::<Vec<u8>>();
        drop(rx);

        let result = dispatch(&mut reader, &mut sink, &mut (), "test", &mut Traffic::default()).await;
        assert!(matches!(result, Err(AudioSocketError::SinkFailure(_))));
    }
}
