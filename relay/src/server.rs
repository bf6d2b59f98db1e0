//! Accept loop and operational metrics.
//!
//! The server handles one session at a time: the accept loop awaits each
//! session inline, so a client is served for its whole lifetime before the
//! next is accepted. Sessions share nothing mutable beyond the atomic
//! counters, so this is a simplicity choice rather than a locking
//! requirement.

use crate::config::{Config, ConfigError};
use crate::error::Result;
use crate::session::Session;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket};

/// Listen backlog for the client-facing socket.
const LISTEN_BACKLOG: u32 = 128;

/// Operational counters for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64` — no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total client connections accepted.
    pub sessions_total: AtomicU64,
    /// Sessions dropped because the device handshake never completed.
    pub sessions_failed: AtomicU64,
    /// Device handshake attempts, including retries.
    pub handshake_attempts: AtomicU64,
    /// Waits taken between handshake attempts.
    pub retry_waits: AtomicU64,
    /// Command bytes relayed client -> device.
    pub bytes_to_device: AtomicU64,
    /// Response bytes relayed device -> client.
    pub bytes_to_client: AtomicU64,
}

/// The relay server: immutable configuration plus the accept loop.
#[derive(Debug)]
pub struct RelayServer {
    config: Arc<Config>,
    metrics: Arc<RelayMetrics>,
}

impl RelayServer {
    /// Server over a validated configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            metrics: Arc::new(RelayMetrics::default()),
        }
    }

    /// The server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Operational metrics handle, shared with the HTTP endpoints.
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        self.metrics.clone()
    }

    /// Bind the client-facing listener.
    ///
    /// Sets `SO_REUSEADDR` so a restarted relay can rebind immediately.
    pub fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr =
            self.config
                .server
                .bind_address
                .parse()
                .map_err(|_| ConfigError::Invalid {
                    reason: format!(
                        "bad bind address \"{}\"",
                        self.config.server.bind_address
                    ),
                })?;

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        Ok(socket.listen(LISTEN_BACKLOG)?)
    }

    /// Bind and run the accept loop forever.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind()?;
        tracing::info!(
            "Listening on {} for device {}",
            self.config.server.bind_address,
            self.config.device.address()
        );
        self.serve(listener).await
    }

    /// Run the accept loop over an already-bound listener.
    ///
    /// Each accepted client is served to completion before the next accept.
    /// Session failures and accept errors are logged and absorbed; nothing
    /// a single client does stops the loop.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (client, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("Accept failed: {e}");
                    continue;
                }
            };

            tracing::info!("Client connected from {peer}");
            self.metrics.sessions_total.fetch_add(1, Ordering::Relaxed);

            let session = Session::new(client, peer, self.config.clone(), self.metrics.clone());
            match session.run().await {
                Ok(summary) => tracing::info!(
                    "Session {peer} closed: {} bytes to device, {} bytes to client",
                    summary.to_device,
                    summary.to_client
                ),
                Err(e) => tracing::warn!("Session {peer} abandoned: {e}"),
            }
        }
    }
}
