//! Byte-exact socket primitives.
//!
//! The handshake deals in fixed five-byte tokens, so reads must deliver
//! exactly the requested count or fail, and writes must transmit the whole
//! buffer or fail. Both primitives are generic over the stream so tests
//! can script a peer with [`tokio::io::duplex`].

use crate::error::WireError;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest chunk moved per receive call.
pub const RECV_SIZE: usize = 1024;

/// Read exactly `want` bytes, assembling across as many receives as needed.
///
/// Every receive is bounded by `timeout`. A zero-length receive before the
/// count is met means the peer closed early and yields
/// [`WireError::ShortRead`]; a timeout or reset yields
/// [`WireError::Channel`]. Never returns a partial buffer.
pub async fn read_exact_bytes<R>(
    reader: &mut R,
    want: usize,
    timeout: Duration,
) -> Result<Vec<u8>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(want);
    let mut chunk = [0u8; RECV_SIZE];

    while buf.len() < want {
        let cap = (want - buf.len()).min(RECV_SIZE);
        let n = match tokio::time::timeout(timeout, reader.read(&mut chunk[..cap])).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(WireError::Channel(e)),
            Err(_) => {
                return Err(WireError::Channel(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "receive timed out",
                )))
            }
        };

        if n == 0 {
            return Err(WireError::ShortRead {
                got: buf.len(),
                want,
            });
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(buf)
}

/// Write the whole buffer, looping over partial sends as needed.
///
/// Returns the number of bytes written. Any send fault, including a
/// timeout, yields [`WireError::Write`]; the caller must treat the
/// connection as broken.
pub async fn send_all<W>(writer: &mut W, data: &[u8], timeout: Duration) -> Result<usize, WireError>
where
    W: AsyncWrite + Unpin,
{
    match tokio::time::timeout(timeout, writer.write_all(data)).await {
        Ok(Ok(())) => Ok(data.len()),
        Ok(Err(e)) => Err(WireError::Write(e)),
        Err(_) => Err(WireError::Write(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "send timed out",
        ))),
    }
}

/// Render wire bytes for logs: printable ASCII stays readable, the rest is
/// escaped.
pub(crate) fn printable(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}
