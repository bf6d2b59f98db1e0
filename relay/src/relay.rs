//! The verbatim byte relay.
//!
//! After the handshake the relay copies the client's command bytes to the
//! device until the client goes quiet, then copies the device's response
//! bytes back until the device goes quiet. Quiet means end-of-stream or no
//! data within the operation timeout; both end a direction normally. The
//! two directions are drained in turn, not concurrently, which matches the
//! strict request-then-response shape of the device protocol.

use crate::wire::{self, RECV_SIZE};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

/// Which way bytes are flowing; used for logs and payload dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client commands toward the device.
    ClientToDevice,
    /// Device responses toward the client.
    DeviceToClient,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::ClientToDevice => "client->device",
            Direction::DeviceToClient => "device->client",
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Direction::ClientToDevice => ">>",
            Direction::DeviceToClient => "<<",
        }
    }
}

/// Copy bytes from `src` to `dst` until `src` goes quiet.
///
/// Each chunk is forwarded immediately and unmodified; nothing is buffered
/// beyond the single transfer chunk. Returns the total bytes moved, which
/// counts only chunks the destination accepted. Send faults and hard
/// receive errors also end the direction, with a warning; the session is
/// torn down right afterwards and the server keeps running.
pub async fn copy_until_quiet<R, W>(
    src: &mut R,
    dst: &mut W,
    timeout: Duration,
    direction: Direction,
) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut chunk = [0u8; RECV_SIZE];
    let mut total: u64 = 0;
    let dump = tracing::enabled!(tracing::Level::DEBUG);
    let mut dumped: Vec<u8> = Vec::new();

    loop {
        let n = match tokio::time::timeout(timeout, src.read(&mut chunk)).await {
            Ok(Ok(0)) => break, // peer closed
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                tracing::warn!("Receive error while relaying {}: {e}", direction.label());
                break;
            }
            Err(_) => break, // idle: the direction is done
        };

        if let Err(e) = wire::send_all(dst, &chunk[..n], timeout).await {
            tracing::warn!("Send error while relaying {}: {e}", direction.label());
            break;
        }
        total += n as u64;

        if dump {
            dumped.extend_from_slice(&chunk[..n]);
        }
    }

    if dump {
        tracing::debug!(
            "Relayed {total} bytes {}\n{} \"{}\"",
            direction.label(),
            direction.marker(),
            wire::printable(&dumped)
        );
    } else {
        tracing::info!("Relayed {total} bytes {}", direction.label());
    }

    total
}
