//! Application layer for vam-bridge.
//!
//! Knows *what* happens to a framed message (filter, publish, count) but not
//! *how* bytes arrive or how they reach the broker.  The broker connection is
//! reached through the [`BusPublisher`] trait so the forwarding logic can be
//! tested without a network.

pub mod forward;
pub mod publisher;

pub use forward::{ForwardOutcome, ForwardStats, Forwarder, StatsSnapshot};
pub use publisher::{BusPublisher, ConnectionState, PublishError};
