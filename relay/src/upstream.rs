//! Upstream connection establishment.
//!
//! Wraps the handshake in the bounded retry policy: a projector that is
//! still powering on refuses or botches early attempts, so a limited
//! number of re-attempts with a fixed wait absorbs that window without
//! blocking forever.

use crate::config::{DeviceConfig, SessionConfig};
use crate::error::{HandshakeError, UpstreamExhausted};
use crate::protocol::Negotiator;
use crate::server::RelayMetrics;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::TcpStream;

/// Connect to the device and complete the handshake, once.
///
/// Covers the connecting phase (TCP connect under the operation timeout)
/// and the token exchange. The stream is dropped, and thereby closed, on
/// any failure.
async fn connect_and_negotiate(
    device: &DeviceConfig,
    timeout: Duration,
) -> Result<TcpStream, HandshakeError> {
    let addr = device.address();

    tracing::info!("Connecting to device ({addr}) ...");
    let connect = TcpStream::connect((device.host.as_str(), device.port));
    let mut stream = match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            tracing::warn!("Could not connect to device ({addr}): {e}");
            return Err(HandshakeError::Connect { addr, source: e });
        }
        Err(_) => {
            tracing::warn!("Connect to device ({addr}) timed out after {timeout:?}");
            return Err(HandshakeError::ConnectTimeout { addr, timeout });
        }
    };
    tracing::info!("Connected to device ({addr}), handshaking ...");

    let mut negotiator = Negotiator::new();
    match negotiator.run(&mut stream, timeout).await {
        Ok(()) => {
            tracing::info!("Handshake with device ({addr}) complete");
            Ok(stream)
        }
        Err(e) => {
            tracing::warn!("Handshake failed during {:?}: {e}", negotiator.phase());
            Err(e)
        }
    }
}

/// Establish a handshaken device connection, retrying per policy.
///
/// Makes up to `retries + 1` attempts and sleeps `retry_wait` between a
/// failure and the next attempt, never after the last. The first
/// established stream is returned; exhaustion collapses every per-attempt
/// cause into [`UpstreamExhausted`].
pub async fn establish(
    device: &DeviceConfig,
    session: &SessionConfig,
    metrics: &RelayMetrics,
) -> Result<TcpStream, UpstreamExhausted> {
    let attempts = session.retries.saturating_add(1);

    for attempt in 0..attempts {
        if attempt > 0 {
            tracing::info!("Retrying in {} second(s) ...", session.retry_wait_secs);
            metrics.retry_waits.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(session.retry_wait()).await;
        }

        metrics.handshake_attempts.fetch_add(1, Ordering::Relaxed);
        if let Ok(stream) = connect_and_negotiate(device, session.timeout()).await {
            return Ok(stream);
        }
    }

    tracing::info!("Failed to establish device connection after {attempts} attempt(s)");
    Err(UpstreamExhausted { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ACK, GREETING, REQUEST};
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn device_config(port: u16) -> DeviceConfig {
        DeviceConfig {
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    fn session_config(retries: u32, retry_wait_secs: u64) -> SessionConfig {
        SessionConfig {
            timeout_secs: 1,
            retries,
            retry_wait_secs,
        }
    }

    /// Fake device that accepts connections and mis-greets every one,
    /// counting accepts.
    async fn mis_greeting_device(counter: Arc<AtomicU32>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let (mut sock, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => break,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                let _ = sock.write_all(b"PJ_XY").await;
            }
        });
        port
    }

    #[tokio::test]
    async fn first_success_returns_the_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let device = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(GREETING).await.unwrap();
            let mut req = [0u8; 5];
            sock.read_exact(&mut req).await.unwrap();
            assert_eq!(&req, REQUEST);
            sock.write_all(ACK).await.unwrap();
        });

        let metrics = RelayMetrics::default();
        let stream = establish(&device_config(port), &session_config(2, 1), &metrics)
            .await
            .unwrap();
        assert!(stream.peer_addr().is_ok());
        assert_eq!(metrics.handshake_attempts.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.retry_waits.load(Ordering::Relaxed), 0);
        device.await.unwrap();
    }

    #[tokio::test]
    async fn zero_retries_means_exactly_one_attempt() {
        let accepts = Arc::new(AtomicU32::new(0));
        let port = mis_greeting_device(accepts.clone()).await;

        let metrics = RelayMetrics::default();
        let err = establish(&device_config(port), &session_config(0, 0), &metrics)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(accepts.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.retry_waits.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn retry_budget_caps_attempts() {
        let accepts = Arc::new(AtomicU32::new(0));
        let port = mis_greeting_device(accepts.clone()).await;

        let metrics = RelayMetrics::default();
        let err = establish(&device_config(port), &session_config(2, 0), &metrics)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(accepts.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.handshake_attempts.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn refusing_device_waits_between_attempts_but_not_after() {
        // No listener on the port: every connect is refused immediately,
        // so elapsed time is the waits alone.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let metrics = RelayMetrics::default();
        let start = Instant::now();
        let err = establish(&device_config(port), &session_config(2, 1), &metrics)
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(err.attempts, 3);
        assert_eq!(metrics.retry_waits.load(Ordering::Relaxed), 2);
        assert!(elapsed >= Duration::from_secs(2), "two waits expected");
        assert!(
            elapsed < Duration::from_secs(3),
            "no wait after the final attempt"
        );
    }

    #[tokio::test]
    async fn success_on_a_later_attempt_stops_retrying() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepts = Arc::new(AtomicU32::new(0));
        let counter = accepts.clone();

        let device = tokio::spawn(async move {
            // First attempt: mis-greet. Second attempt: complete handshake.
            let (mut first, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::Relaxed);
            first.write_all(b"PJ_XY").await.unwrap();
            drop(first);

            let (mut second, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::Relaxed);
            second.write_all(GREETING).await.unwrap();
            let mut req = [0u8; 5];
            second.read_exact(&mut req).await.unwrap();
            second.write_all(ACK).await.unwrap();
        });

        let metrics = RelayMetrics::default();
        let stream = establish(&device_config(port), &session_config(3, 0), &metrics)
            .await
            .unwrap();
        assert!(stream.peer_addr().is_ok());
        assert_eq!(accepts.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.handshake_attempts.load(Ordering::Relaxed), 2);
        device.await.unwrap();
    }
}
