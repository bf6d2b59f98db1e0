//! Error types for jvc-relay.

use std::time::Duration;

/// Main error type for relay startup faults.
///
/// Once the accept loop is running, session-level failures are logged and
/// absorbed; nothing in this enum is ever produced by a single bad session.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O error binding or serving the listening socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Faults from the byte-exact socket primitives.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The peer closed the stream before the required byte count arrived.
    #[error("short read: peer closed after {got} of {want} bytes")]
    ShortRead {
        /// Bytes collected before the close.
        got: usize,
        /// Bytes required.
        want: usize,
    },

    /// The underlying receive failed or timed out.
    #[error("receive failed: {0}")]
    Channel(#[source] std::io::Error),

    /// The underlying send failed; the connection must be treated as broken.
    #[error("send failed: {0}")]
    Write(#[source] std::io::Error),
}

/// A single failed handshake attempt against the device.
///
/// The variant records which phase went wrong for logging; callers above
/// the retrier treat every variant as the same collapsed negotiation
/// failure.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// TCP connect to the device failed.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        /// Device address in `host:port` form.
        addr: String,
        /// Underlying connect error.
        #[source]
        source: std::io::Error,
    },

    /// TCP connect to the device did not complete within the timeout.
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Device address in `host:port` form.
        addr: String,
        /// Configured operation timeout.
        timeout: Duration,
    },

    /// The device greeted with something other than `PJ_OK`.
    #[error("unexpected greeting \"{}\"", crate::wire::printable(.actual))]
    Greeting {
        /// The bytes the device actually sent.
        actual: Vec<u8>,
    },

    /// The device answered the request with something other than `PJACK`.
    #[error("request not acknowledged, got \"{}\"", crate::wire::printable(.actual))]
    Ack {
        /// The bytes the device actually sent.
        actual: Vec<u8>,
    },

    /// A read or write failed mid-handshake.
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Overall failure of upstream establishment after the retry budget.
///
/// This is the single outcome the acceptor sees; which phase failed on
/// which attempt is visible only in the logs.
#[derive(Debug, thiserror::Error)]
#[error("no device connection after {attempts} attempt(s)")]
pub struct UpstreamExhausted {
    /// Attempts performed (retry count + 1).
    pub attempts: u32,
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_reports_counts() {
        let err = WireError::ShortRead { got: 3, want: 5 };
        assert_eq!(err.to_string(), "short read: peer closed after 3 of 5 bytes");
    }

    #[test]
    fn greeting_mismatch_shows_received_bytes() {
        let err = HandshakeError::Greeting {
            actual: b"PJ_XY".to_vec(),
        };
        assert_eq!(err.to_string(), "unexpected greeting \"PJ_XY\"");
    }

    #[test]
    fn mismatch_escapes_unprintable_bytes() {
        let err = HandshakeError::Ack {
            actual: vec![0x50, 0x4a, 0x00, 0xff, 0x0a],
        };
        let text = err.to_string();
        assert!(text.contains("PJ"));
        assert!(text.contains("\\x00"));
        assert!(text.contains("\\xff"));
    }

    #[test]
    fn exhausted_counts_attempts() {
        let err = UpstreamExhausted { attempts: 3 };
        assert_eq!(err.to_string(), "no device connection after 3 attempt(s)");
    }
}
