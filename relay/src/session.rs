//! Per-client session lifecycle.
//!
//! A session exists from accept to full teardown: establish the device
//! connection (with retries), drain the two relay directions in turn, and
//! close both streams on every path. Dropping a [`Session`] closes
//! whatever it still owns, so no exit path can leak a connection.

use crate::config::Config;
use crate::error::UpstreamExhausted;
use crate::relay::{copy_until_quiet, Direction};
use crate::server::RelayMetrics;
use crate::upstream;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpStream;

/// Byte totals for a completed relay phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    /// Bytes moved client -> device.
    pub to_device: u64,
    /// Bytes moved device -> client.
    pub to_client: u64,
}

/// One accepted client connection, from handshake through teardown.
pub struct Session {
    client: TcpStream,
    peer: SocketAddr,
    config: Arc<Config>,
    metrics: Arc<RelayMetrics>,
}

impl Session {
    /// Session for a freshly accepted client connection.
    pub fn new(
        client: TcpStream,
        peer: SocketAddr,
        config: Arc<Config>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            client,
            peer,
            config,
            metrics,
        }
    }

    /// Run the session to completion.
    ///
    /// On establishment failure the client is dropped without any relaying
    /// and the collapsed failure is returned. Otherwise the client's
    /// command stream is drained to the device first, then the device's
    /// response stream back to the client, and the byte totals are
    /// returned. Both connections are closed on every path.
    pub async fn run(mut self) -> Result<RelaySummary, UpstreamExhausted> {
        let mut device =
            match upstream::establish(&self.config.device, &self.config.session, &self.metrics)
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(
                        "Could not reach device ({}); dropping client {}",
                        self.config.device.address(),
                        self.peer
                    );
                    self.metrics.sessions_failed.fetch_add(1, Ordering::Relaxed);
                    return Err(e);
                }
            };

        let timeout = self.config.session.timeout();
        let to_device = copy_until_quiet(
            &mut self.client,
            &mut device,
            timeout,
            Direction::ClientToDevice,
        )
        .await;
        let to_client = copy_until_quiet(
            &mut device,
            &mut self.client,
            timeout,
            Direction::DeviceToClient,
        )
        .await;

        self.metrics
            .bytes_to_device
            .fetch_add(to_device, Ordering::Relaxed);
        self.metrics
            .bytes_to_client
            .fetch_add(to_client, Ordering::Relaxed);

        Ok(RelaySummary {
            to_device,
            to_client,
        })
    }
}
