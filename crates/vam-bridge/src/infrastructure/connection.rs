//! Per-connection handler: framer → filter → publisher.
//!
//! [`handle_connection`] takes ownership of the accepted stream.  Whatever
//! way the loop ends (end-of-stream, reset, read error) the stream is dropped
//! exactly once when the function returns, which closes the socket.  There is
//! no retry at this level and nothing is ever written back to the client.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::{debug, info, warn};
use vam_core::FramingPolicy;

use crate::application::{ForwardOutcome, Forwarder};
use crate::infrastructure::framer::{MessageFramer, NextMessage};

/// How a connection ended.
#[derive(Debug)]
pub enum ConnectionEnd {
    /// The peer closed its side.
    EndOfStream,
    /// A read failed; the connection is abandoned.
    ReadError(std::io::Error),
}

/// Per-connection tallies, returned when the handler finishes.
#[derive(Debug)]
pub struct ConnectionSummary {
    pub forwarded: u64,
    pub ignored: u64,
    pub failed: u64,
    pub malformed: u64,
    pub end: ConnectionEnd,
}

/// Runs the read/filter/publish loop for one connection until it ends.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    policy: &FramingPolicy,
    forwarder: Arc<Forwarder>,
) -> ConnectionSummary
where
    S: AsyncRead + Unpin,
{
    debug!(%peer, framing = %policy.mode, "connection handler started");
    let mut framer = MessageFramer::new(stream, policy);
    let mut summary = ConnectionSummary {
        forwarded: 0,
        ignored: 0,
        failed: 0,
        malformed: 0,
        end: ConnectionEnd::EndOfStream,
    };

    loop {
        match framer.next_message().await {
            Ok(NextMessage::Message(message)) => {
                match forwarder.forward(peer, &message).await {
                    ForwardOutcome::Forwarded => summary.forwarded += 1,
                    ForwardOutcome::Ignored => summary.ignored += 1,
                    ForwardOutcome::Failed(_) => summary.failed += 1,
                }
            }
            Ok(NextMessage::Malformed(e)) => {
                forwarder.record_malformed(peer, &e);
                summary.malformed += 1;
            }
            Ok(NextMessage::EndOfStream) => {
                info!(%peer, "client disconnected");
                break;
            }
            Err(e) => {
                match e.kind() {
                    std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => {
                        info!(%peer, error = %e, "connection reset by client")
                    }
                    _ => warn!(%peer, error = %e, "read failed; closing connection"),
                }
                summary.end = ConnectionEnd::ReadError(e);
                break;
            }
        }
    }

    debug!(
        %peer,
        forwarded = summary.forwarded,
        ignored = summary.ignored,
        failed = summary.failed,
        malformed = summary.malformed,
        "connection handler finished"
    );
    summary
}

// ── Tests ─────────────────────────────────────────────────────────────────────
