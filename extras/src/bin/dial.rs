use std::time::Duration;

use audiosocket_sdk::protocol::Identity;
use audiosocket_sdk::{connect, LogHandler, PcmBuffer, RelayConfig, Session};
use tracing::{error, info};

const SAMPLE_RATE: u32 = 8000;
const DEFAULT_MAX_CALL_SECS: u64 = 120;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: dial <host:port> <wav_file> [record_wav_file]");
        eprintln!("Example: dial 127.0.0.1:8080 prompt.wav reply.wav");
        std::process::exit(1);
    }

    let endpoint = &args[1];
    let wav_file = &args[2];
    let record_file = args.get(3);
    let max_call = max_call_duration();

    info!("Dialing {}", endpoint);
    info!("WAV file: {}", wav_file);

    let pcm = load_wav(wav_file)?;
    info!("WAV file loaded: {} bytes ({:?})", pcm.len(), clip_duration(pcm.len()));

    let config = RelayConfig::default();
    let stream = connect(endpoint, config.connect_timeout).await?;
    let identity = Identity::random();
    info!("Connected, call id {}", identity);

    let session = Session::dial(stream, identity, config).await?;

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, hanging up");
            cancel.cancel();
        }
    });

    let mut received = Vec::<u8>::new();
    let summary = session
        .run(
            PcmBuffer::new(pcm),
            &mut received,
            LogHandler::new("dial"),
            max_call,
        )
        .await;

    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => {
            error!("Call failed: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Call ended ({:?}): sent {} frames, received {} frames",
        summary.disposition, summary.frames_sent, summary.frames_received
    );

    if let Some(path) = record_file {
        save_wav(path, &received)?;
        info!("Recorded {:?} of audio to {}", clip_duration(received.len()), path);
    }

    Ok(())
}

/// Upper bound on the call from `AUDIOSOCKET_MAX_CALL_SECS`, two minutes by default.
fn max_call_duration() -> Duration {
    let secs = std::env::var("AUDIOSOCKET_MAX_CALL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CALL_SECS);
    Duration::from_secs(secs)
}

/// Reads an 8kHz mono 16-bit WAV file as little-endian PCM bytes.
fn load_wav(path: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    // Validate WAV file format
    if spec.sample_rate != SAMPLE_RATE {
        error!(
            "Invalid sample rate: {}. Expected {} Hz",
            spec.sample_rate, SAMPLE_RATE
        );
        return Err("Invalid sample rate".into());
    }

    if spec.channels != 1 {
        error!(
            "Invalid channels: {}. Expected mono (1 channel)",
            spec.channels
        );
        return Err("Not mono audio".into());
    }

    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        error!(
            "Invalid bit depth: {}. Expected 16-bit integer",
            spec.bits_per_sample
        );
        return Err("Invalid bit depth".into());
    }

    let samples: Vec<i16> = reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    Ok(samples.iter().flat_map(|s| s.to_le_bytes()).collect())
}

/// Writes little-endian PCM bytes as an 8kHz mono 16-bit WAV file.
fn save_wav(path: &str, pcm: &[u8]) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
    }
    writer.finalize()
}

fn clip_duration(bytes: usize) -> Duration {
    Duration::from_millis(bytes as u64 * 1000 / (u64::from(SAMPLE_RATE) * 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("{}-{}.wav", name, Identity::random()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn wav_round_trip_keeps_samples() {
        let path = temp_path("dial-roundtrip");
        let pcm: Vec<u8> = [0i16, 1, -1, i16::MAX, i16::MIN]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        save_wav(&path, &pcm).unwrap();
        let loaded = load_wav(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, pcm);
    }

    #[test]
    fn rejects_wrong_sample_rate() {
        let path = temp_path("dial-48k");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        let result = load_wav(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn duration_of_one_frame() {
        assert_eq!(clip_duration(320), Duration::from_millis(20));
    }
}
