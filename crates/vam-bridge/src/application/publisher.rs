//! The seam between forwarding logic and the message bus.

use async_trait::async_trait;
use thiserror::Error;

/// State of the single broker connection, as seen by publishers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Why a publish did not reach the bus.
///
/// Publishing is best effort: the caller logs the error and drops the
/// message.  Nothing here is fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("broker connection is {0}")]
    NotConnected(ConnectionState),

    #[error("publish rejected by client: {0}")]
    Rejected(String),
}

/// Publishes payloads on the shared broker connection.
///
/// Implementations must be safe to call concurrently from every connection
/// handler; each call hands one complete message to the transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BusPublisher: Send + Sync {
    /// Publishes `payload` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the broker is unreachable or the client
    /// refuses the request.  Never panics.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;

    /// Current connection state.
    fn state(&self) -> ConnectionState;
}
