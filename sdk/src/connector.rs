//! Outbound connection establishment with a per-address timeout.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tracing::{debug, info, warn};

use crate::error::AudioSocketError;

/// Connect to an AudioSocket service at `endpoint` (`host:port`).
///
/// Every resolved address is tried in order, each bounded by `timeout`. The
/// first established connection is returned; no retry happens once every
/// candidate has failed.
///
/// # Errors
/// [`AudioSocketError::InvalidEndpoint`] or [`AudioSocketError::Resolve`] if the
/// endpoint cannot be turned into addresses, otherwise
/// [`AudioSocketError::ConnectFailed`] carrying the last candidate's failure.
pub async fn connect(endpoint: &str, timeout: Duration) -> Result<TcpStream, AudioSocketError> {
    let candidates = resolve(endpoint).await?;
    debug!("{} resolved to {} address(es)", endpoint, candidates.len());
    connect_any(endpoint, &candidates, timeout).await
}

/// Try `candidates` in order, returning the first that connects.
async fn connect_any(
    endpoint: &str,
    candidates: &[SocketAddr],
    timeout: Duration,
) -> Result<TcpStream, AudioSocketError> {
    let mut last = None;
    for addr in candidates {
        match connect_addr(*addr, timeout).await {
            Ok(stream) => {
                info!("Connected to AudioSocket service {} at {}", endpoint, addr);
                return Ok(stream);
            }
            Err(e) => {
                warn!("Connect to '{}' via {} failed: {}", endpoint, addr, e);
                last = Some(Box::new(e));
            }
        }
    }

    Err(AudioSocketError::ConnectFailed {
        endpoint: endpoint.to_string(),
        attempts: candidates.len(),
        last,
    })
}

/// Connect to a single address with a bounded non-blocking connect.
///
/// # Errors
/// [`AudioSocketError::ConnectTimeout`], [`AudioSocketError::ConnectRefused`] or
/// [`AudioSocketError::ConnectIo`].
pub async fn connect_addr(addr: SocketAddr, timeout: Duration) -> Result<TcpStream, AudioSocketError> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(|source| AudioSocketError::ConnectIo { addr, source })?;

    let stream = match tokio::time::timeout(timeout, socket.connect(addr)).await {
        Err(_) => return Err(AudioSocketError::ConnectTimeout { addr, timeout }),
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
            return Err(AudioSocketError::ConnectRefused { addr })
        }
        Ok(Err(source)) => return Err(AudioSocketError::ConnectIo { addr, source }),
        Ok(Ok(stream)) => stream,
    };

    // Small audio frames must not wait on Nagle's algorithm.
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY on {}: {}", addr, e);
    }
    Ok(stream)
}

async fn resolve(endpoint: &str) -> Result<Vec<SocketAddr>, AudioSocketError> {
    let invalid = |reason| AudioSocketError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    if endpoint.trim().is_empty() {
        return Err(invalid("no AudioSocket server provided"));
    }
    let Some((host, port)) = endpoint.rsplit_once(':') else {
        return Err(invalid("a port is required"));
    };
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => return Err(invalid("a port is required")),
        Ok(_) => {}
    }

    let addrs: Vec<SocketAddr> = lookup_host(endpoint)
        .await
        .map_err(|source| AudioSocketError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(AudioSocketError::Resolve {
            endpoint: endpoint.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
        });
    }
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn dead_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    #[tokio::test]
    async fn connects_to_listening_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let stream = connect(&addr.to_string(), Duration::from_secs(1))
            .await
            .expect("connect should succeed");
        assert_eq!(stream.peer_addr().unwrap(), addr);

        let (_accepted, _) = listener.accept().await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_fails_without_retry() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = connect(&addr.to_string(), Duration::from_secs(1))
            .await
            .expect_err("nothing is listening");

        match err {
            AudioSocketError::ConnectFailed { attempts, last, .. } => {
                assert_eq!(attempts, 1);
                assert!(matches!(
                    last.as_deref(),
                    Some(AudioSocketError::ConnectRefused { .. })
                ));
            }
            other => panic!("expected ConnectFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn falls_through_to_next_candidate() {
        let dead = dead_addr().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live = listener.local_addr().unwrap();

        let stream = connect_any("test", &[dead, live], Duration::from_secs(1))
            .await
            .expect("second candidate should connect");
        assert_eq!(stream.peer_addr().unwrap(), live);
    }

    #[tokio::test]
    async fn every_candidate_failing_reports_the_last() {
        let first = dead_addr().await;
        let second = dead_addr().await;

        let err = connect_any("test", &[first, second], Duration::from_secs(1))
            .await
            .unwrap_err();
        match err {
            AudioSocketError::ConnectFailed { attempts, last, .. } => {
                assert_eq!(attempts, 2);
                assert!(matches!(
                    last.as_deref(),
                    Some(AudioSocketError::ConnectRefused { addr }) if *addr == second
                ));
            }
            other => panic!("expected ConnectFailed, got {other:?}"),
        }
    }

    // Linux drops SYNs once a listener's accept queue is full, so the next
    // connect hangs until the timeout.
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn unanswered_connect_times_out() {
        let socket = TcpSocket::new_v4().unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(1).unwrap();
        let addr = listener.local_addr().unwrap();
        let limit = Duration::from_millis(200);

        let mut held = Vec::new();
        let mut timed_out = None;
        for _ in 0..16 {
            match connect_addr(addr, limit).await {
                Ok(stream) => held.push(stream),
                Err(e) => {
                    timed_out = Some(e);
                    break;
                }
            }
        }

        match timed_out {
            Some(AudioSocketError::ConnectTimeout { addr: failed, timeout }) => {
                assert_eq!(failed, addr);
                assert_eq!(timeout, limit);
            }
            other => panic!("expected ConnectTimeout, got {other:?}"),
        }
        drop(listener);
    }

    #[tokio::test]
    async fn endpoint_without_port_is_invalid() {
        let err = connect("localhost", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, AudioSocketError::InvalidEndpoint { .. }));

        let err = connect("", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, AudioSocketError::InvalidEndpoint { .. }));

        let err = connect("127.0.0.1:0", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, AudioSocketError::InvalidEndpoint { .. }));
        assert!(err.is_connect_error());
    }
}
