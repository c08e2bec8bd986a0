//! Forwarder: filter a framed message and publish it if it qualifies.
//!
//! One [`Forwarder`] is built at startup and shared (behind an `Arc`) by every
//! connection handler.  It holds no per-connection state; the only mutable
//! state is the set of atomic counters in [`ForwardStats`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use vam_core::{FramedMessage, MessageError, PatternFilter};

use super::publisher::{BusPublisher, PublishError};

/// What happened to one framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Matched the filter and was handed to the bus.
    Forwarded,
    /// Did not match the filter; dropped silently.
    Ignored,
    /// Matched, but the publish failed; dropped.
    Failed(PublishError),
}

/// Counters kept across all connections.
#[derive(Debug, Default)]
pub struct ForwardStats {
    forwarded: AtomicU64,
    ignored: AtomicU64,
    publish_failed: AtomicU64,
    malformed: AtomicU64,
}

/// Point-in-time copy of [`ForwardStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub forwarded: u64,
    pub ignored: u64,
    pub publish_failed: u64,
    pub malformed: u64,
}

impl ForwardStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            publish_failed: self.publish_failed.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "forwarded={} ignored={} publish_failed={} malformed={}",
            self.forwarded, self.ignored, self.publish_failed, self.malformed
        )
    }
}

/// Filters framed messages and publishes the matching ones on one topic.
pub struct Forwarder {
    filter: PatternFilter,
    publisher: Arc<dyn BusPublisher>,
    topic: String,
    stats: ForwardStats,
}

impl Forwarder {
    pub fn new(publisher: Arc<dyn BusPublisher>, topic: impl Into<String>) -> Self {
        Self {
            filter: PatternFilter::new(),
            publisher,
            topic: topic.into(),
            stats: ForwardStats::default(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Filters `message` and publishes it verbatim if it matches.
    ///
    /// Every outcome is logged with `peer`.  The returned value is for
    /// callers and tests; nothing needs to act on it.
    pub async fn forward(&self, peer: SocketAddr, message: &FramedMessage) -> ForwardOutcome {
        if !self.filter.matches(message.as_str()) {
            self.stats.ignored.fetch_add(1, Ordering::Relaxed);
            debug!(%peer, message = %message, "ignored: no pattern match");
            return ForwardOutcome::Ignored;
        }

        match self.publisher.publish(&self.topic, message.as_bytes()).await {
            Ok(()) => {
                self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
                info!(%peer, topic = %self.topic, message = %message, "forwarded");
                ForwardOutcome::Forwarded
            }
            Err(e) => {
                self.stats.publish_failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    %peer,
                    topic = %self.topic,
                    message = %message,
                    error = %e,
                    "publish failed; message dropped"
                );
                ForwardOutcome::Failed(e)
            }
        }
    }

    /// Records a frame that could not be decoded into a message.
    pub fn record_malformed(&self, peer: SocketAddr, error: &MessageError) {
        self.stats.malformed.fetch_add(1, Ordering::Relaxed);
        warn!(%peer, error = %error, "malformed message dropped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
