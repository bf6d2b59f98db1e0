//! The projector handshake.
//!
//! After TCP connect the projector speaks first:
//!
//! ```text
//! device -> relay   PJ_OK   (greeting)
//! relay  -> device  PJREQ   (request)
//! device -> relay   PJACK   (acknowledgement)
//! ```
//!
//! Every token is exactly five bytes and compared by byte equality. Once
//! the exchange completes the connection carries the vendor command stream
//! verbatim.

use crate::error::HandshakeError;
use crate::wire;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Greeting the device sends immediately after connect.
pub const GREETING: &[u8] = b"PJ_OK";

/// Request the relay sends to claim the connection.
pub const REQUEST: &[u8] = b"PJREQ";

/// Acknowledgement the device sends for an accepted request.
pub const ACK: &[u8] = b"PJACK";

/// Phases of the handshake state machine.
///
/// Any phase can fall to failure; the error variant and the negotiator's
/// last phase record where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// TCP connect in progress.
    Connecting,
    /// Waiting for the device greeting.
    AwaitGreeting,
    /// Sending the request token.
    SendRequest,
    /// Waiting for the device acknowledgement.
    AwaitAck,
    /// Handshake complete; the connection is usable.
    Established,
}

/// Drives the token exchange on an already-connected stream.
///
/// The negotiator borrows the stream and owns no connection itself; when
/// [`Negotiator::run`] fails the caller drops the stream, which closes the
/// half-opened link.
#[derive(Debug)]
pub struct Negotiator {
    phase: HandshakePhase,
}

impl Negotiator {
    /// Negotiator for a freshly connected stream.
    pub fn new() -> Self {
        Self {
            phase: HandshakePhase::AwaitGreeting,
        }
    }

    /// The phase the exchange has reached.
    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    /// Run the exchange to completion.
    ///
    /// On success the stream is established and ready for relaying. On
    /// error [`Negotiator::phase`] reports where the exchange stopped and
    /// the stream must be discarded.
    pub async fn run<S>(&mut self, stream: &mut S, timeout: Duration) -> Result<(), HandshakeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.phase = HandshakePhase::AwaitGreeting;
        let greeting = wire::read_exact_bytes(stream, GREETING.len(), timeout).await?;
        if greeting != GREETING {
            return Err(HandshakeError::Greeting { actual: greeting });
        }

        self.phase = HandshakePhase::SendRequest;
        wire::send_all(stream, REQUEST, timeout).await?;

        self.phase = HandshakePhase::AwaitAck;
        let ack = wire::read_exact_bytes(stream, ACK.len(), timeout).await?;
        if ack != ACK {
            return Err(HandshakeError::Ack { actual: ack });
        }

        self.phase = HandshakePhase::Established;
        Ok(())
    }
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WireError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const TIMEOUT: Duration = Duration::from_millis(200);

    #[test]
    fn tokens_are_five_bytes() {
        assert_eq!(GREETING.len(), 5);
        assert_eq!(REQUEST.len(), 5);
        assert_eq!(ACK.len(), 5);
    }

    #[tokio::test]
    async fn exact_tokens_reach_established() {
        let (mut near, mut far) = tokio::io::duplex(64);

        let device = tokio::spawn(async move {
            far.write_all(GREETING).await.unwrap();
            let mut req = [0u8; 5];
            far.read_exact(&mut req).await.unwrap();
            assert_eq!(&req, REQUEST);
            far.write_all(ACK).await.unwrap();
        });

        let mut negotiator = Negotiator::new();
        negotiator.run(&mut near, TIMEOUT).await.unwrap();
        assert_eq!(negotiator.phase(), HandshakePhase::Established);
        device.await.unwrap();
    }

    #[tokio::test]
    async fn wrong_greeting_fails_before_request_is_sent() {
        let (mut near, mut far) = tokio::io::duplex(64);

        far.write_all(b"PJ_XY").await.unwrap();

        let mut negotiator = Negotiator::new();
        let err = negotiator.run(&mut near, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, HandshakeError::Greeting { ref actual } if actual == b"PJ_XY"));
        assert_eq!(negotiator.phase(), HandshakePhase::AwaitGreeting);

        // The caller discards the stream; the device must see end-of-stream
        // without ever receiving a request byte.
        drop(near);
        let mut buf = [0u8; 5];
        let n = far.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "no request may follow a bad greeting");
    }

    #[tokio::test]
    async fn wrong_ack_fails_in_await_ack() {
        let (mut near, mut far) = tokio::io::duplex(64);

        let device = tokio::spawn(async move {
            far.write_all(GREETING).await.unwrap();
            let mut req = [0u8; 5];
            far.read_exact(&mut req).await.unwrap();
            far.write_all(b"PJNAK").await.unwrap();
        });

        let mut negotiator = Negotiator::new();
        let err = negotiator.run(&mut near, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, HandshakeError::Ack { ref actual } if actual == b"PJNAK"));
        assert_eq!(negotiator.phase(), HandshakePhase::AwaitAck);
        device.await.unwrap();
    }

    #[tokio::test]
    async fn truncated_greeting_is_a_short_read() {
        let (mut near, mut far) = tokio::io::duplex(64);

        far.write_all(b"PJ").await.unwrap();
        drop(far);

        let mut negotiator = Negotiator::new();
        let err = negotiator.run(&mut near, TIMEOUT).await.unwrap_err();
        assert!(matches!(
            err,
            HandshakeError::Wire(WireError::ShortRead { got: 2, want: 5 })
        ));
        assert_eq!(negotiator.phase(), HandshakePhase::AwaitGreeting);
    }

    #[tokio::test]
    async fn silent_device_times_out_in_await_ack() {
        let (mut near, mut far) = tokio::io::duplex(64);

        far.write_all(GREETING).await.unwrap();
        // Device accepts the request but never acknowledges.

        let mut negotiator = Negotiator::new();
        let err = negotiator
            .run(&mut near, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::Wire(WireError::Channel(_))));
        assert_eq!(negotiator.phase(), HandshakePhase::AwaitAck);
    }
}
